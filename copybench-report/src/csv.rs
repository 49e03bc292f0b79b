//! CSV Output
//!
//! One header row (`length,align1,align2,<ifunc>...`) and one row per case.
//! Skipped candidates leave an empty cell.

use crate::sink::{ReportError, ResultSink, RunHeader};
use copybench_core::TestCase;
use std::io::Write;

/// Streams cases as CSV rows
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    out: W,
    slots: usize,
    filled: usize,
}

impl<W: Write> CsvSink<W> {
    /// Write rows to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            slots: 0,
            filled: 0,
        }
    }

    /// Recover the output
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn begin(&mut self, header: &RunHeader) -> Result<(), ReportError> {
        self.slots = header.ifuncs.len();
        write!(self.out, "length,align1,align2")?;
        for name in &header.ifuncs {
            write!(self.out, ",{}", escape(name))?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn begin_case(&mut self, case: &TestCase) -> Result<(), ReportError> {
        self.filled = 0;
        write!(
            self.out,
            "{},{},{}",
            case.length, case.align_src, case.align_dst
        )?;
        Ok(())
    }

    fn timing(&mut self, value: Option<f64>) -> Result<(), ReportError> {
        self.filled += 1;
        match value {
            Some(v) => write!(self.out, ",{}", v)?,
            None => write!(self.out, ",")?,
        }
        Ok(())
    }

    fn end_case(&mut self) -> Result<(), ReportError> {
        if self.filled != self.slots {
            return Err(ReportError::SlotCount {
                expected: self.slots,
                actual: self.filled,
            });
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let header = RunHeader {
            timing_type: "hp_timing".to_string(),
            unit: "cycles".to_string(),
            operation: "memcpy".to_string(),
            bench_variant: "default".to_string(),
            ifuncs: vec!["a".to_string(), "b,c".to_string()],
        };

        let mut sink = CsvSink::new(Vec::new());
        sink.begin(&header).unwrap();
        sink.begin_case(&TestCase::new(32, 4, 0)).unwrap();
        sink.timing(Some(12.5)).unwrap();
        sink.timing(None).unwrap();
        sink.end_case().unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "length,align1,align2,a,\"b,c\"\n32,4,0,12.5,\n");
    }
}
