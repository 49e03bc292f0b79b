//! Human-Readable Output
//!
//! Terminal-friendly table, streamed one row per case:
//!
//! ```text
//! memcpy (variant: default, timing: hp_timing, cycles per call)
//! ------------------------------------------------------------------------
//!   length  align1  align2  simple_memcpy  builtin_memcpy  memcpy  fastest
//!        1       0       0          21.50            9.25    9.00  memcpy
//! ```
//!
//! Failed candidates show `FAIL`. Only one row is buffered at a time.

use crate::sink::{ReportError, ResultSink, RunHeader, fastest};
use copybench_core::TestCase;
use std::io::Write;

const MIN_COLUMN: usize = 8;

/// Streams an aligned text table
#[derive(Debug)]
pub struct HumanSink<W: Write> {
    out: W,
    names: Vec<String>,
    widths: Vec<usize>,
    row: Vec<Option<f64>>,
    cases: usize,
    skipped: usize,
}

impl<W: Write> HumanSink<W> {
    /// Write the table to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: Vec::new(),
            widths: Vec::new(),
            row: Vec::new(),
            cases: 0,
            skipped: 0,
        }
    }

    /// Recover the output
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for HumanSink<W> {
    fn begin(&mut self, header: &RunHeader) -> Result<(), ReportError> {
        self.names = header.ifuncs.clone();
        self.widths = self.names.iter().map(|n| n.len().max(MIN_COLUMN)).collect();

        writeln!(
            self.out,
            "{} (variant: {}, timing: {}, {} per call)",
            header.operation, header.bench_variant, header.timing_type, header.unit
        )?;
        let total: usize = 24 + self.widths.iter().map(|w| w + 2).sum::<usize>() + 9;
        writeln!(self.out, "{}", "-".repeat(total))?;

        write!(self.out, "  {:>6}  {:>6}  {:>6}", "length", "align1", "align2")?;
        for (name, width) in self.names.iter().zip(&self.widths) {
            write!(self.out, "  {:>width$}", name, width = *width)?;
        }
        writeln!(self.out, "  fastest")?;
        Ok(())
    }

    fn begin_case(&mut self, case: &TestCase) -> Result<(), ReportError> {
        self.row.clear();
        write!(
            self.out,
            "  {:>6}  {:>6}  {:>6}",
            case.length, case.align_src, case.align_dst
        )?;
        Ok(())
    }

    fn timing(&mut self, value: Option<f64>) -> Result<(), ReportError> {
        let width = self.widths.get(self.row.len()).copied().unwrap_or(MIN_COLUMN);
        match value {
            Some(v) => write!(self.out, "  {:>width$.2}", v, width = width)?,
            None => {
                self.skipped += 1;
                write!(self.out, "  {:>width$}", "FAIL", width = width)?
            }
        }
        self.row.push(value);
        Ok(())
    }

    fn end_case(&mut self) -> Result<(), ReportError> {
        if self.row.len() != self.names.len() {
            return Err(ReportError::SlotCount {
                expected: self.names.len(),
                actual: self.row.len(),
            });
        }
        self.cases += 1;
        let winner = fastest(&self.row)
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
            .unwrap_or("-");
        writeln!(self.out, "  {}", winner)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{} case(s), {} candidate(s), {} skipped result(s)",
            self.cases,
            self.names.len(),
            self.skipped
        )?;
        self.out.flush()?;
        Ok(())
    }
}
