//! JSON Output
//!
//! Emits the result document consumed by analysis tooling:
//!
//! ```text
//! {
//!   "timing_type": "hp_timing",
//!   "functions": {
//!     "memcpy": {
//!       "bench-variant": "default",
//!       "ifuncs": ["simple_memcpy", "builtin_memcpy", ...],
//!       "results": [
//!         { "length": 1, "align1": 0, "align2": 0, "timings": [12.5, 3.1, ...] },
//!         ...
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! `timings[i]` belongs to `ifuncs[i]`; `null` marks a candidate skipped after
//! failing the correctness gate.

use crate::sink::{ReportError, ResultSink, RunHeader};
use crate::writer::JsonWriter;
use copybench_core::TestCase;
use std::io::Write;

/// Streams the result document through a [`JsonWriter`]
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: JsonWriter<W>,
    slots: usize,
    filled: usize,
}

impl<W: Write> JsonSink<W> {
    /// Write the document to `out`
    pub fn new(out: W) -> Self {
        Self {
            writer: JsonWriter::new(out),
            slots: 0,
            filled: 0,
        }
    }

    /// Recover the output after [`ResultSink::finish`]
    pub fn into_inner(self) -> Result<W, ReportError> {
        self.writer.finish()
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn begin(&mut self, header: &RunHeader) -> Result<(), ReportError> {
        self.slots = header.ifuncs.len();

        let w = &mut self.writer;
        w.document_begin()?;
        w.attr_string("timing_type", &header.timing_type)?;
        w.attr_object_begin("functions")?;
        w.attr_object_begin(&header.operation)?;
        w.attr_string("bench-variant", &header.bench_variant)?;
        w.array_begin("ifuncs")?;
        for name in &header.ifuncs {
            w.element_string(name)?;
        }
        w.array_end()?;
        w.array_begin("results")?;
        Ok(())
    }

    fn begin_case(&mut self, case: &TestCase) -> Result<(), ReportError> {
        self.filled = 0;

        let w = &mut self.writer;
        w.element_object_begin()?;
        w.attr_uint("length", case.length as u64)?;
        w.attr_uint("align1", case.align_src as u64)?;
        w.attr_uint("align2", case.align_dst as u64)?;
        w.array_begin("timings")?;
        Ok(())
    }

    fn timing(&mut self, value: Option<f64>) -> Result<(), ReportError> {
        self.filled += 1;
        match value {
            Some(v) => self.writer.element_double(v),
            None => self.writer.element_null(),
        }
    }

    fn end_case(&mut self) -> Result<(), ReportError> {
        if self.filled != self.slots {
            return Err(ReportError::SlotCount {
                expected: self.slots,
                actual: self.filled,
            });
        }
        self.writer.array_end()?;
        self.writer.element_object_end()
    }

    fn finish(&mut self) -> Result<(), ReportError> {
        let w = &mut self.writer;
        w.array_end()?;
        w.attr_object_end()?;
        w.attr_object_end()?;
        w.document_end()?;
        w.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BenchDocument;

    fn header() -> RunHeader {
        RunHeader {
            timing_type: "clock_gettime".to_string(),
            unit: "ns".to_string(),
            operation: "memcpy".to_string(),
            bench_variant: "default".to_string(),
            ifuncs: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_document_schema() {
        let mut sink = JsonSink::new(Vec::new());
        sink.begin(&header()).unwrap();
        sink.begin_case(&TestCase::new(10, 1, 2)).unwrap();
        sink.timing(Some(4.25)).unwrap();
        sink.timing(None).unwrap();
        sink.end_case().unwrap();
        sink.begin_case(&TestCase::new(0, 0, 0)).unwrap();
        sink.timing(Some(1.0)).unwrap();
        sink.timing(Some(2.0)).unwrap();
        sink.end_case().unwrap();
        sink.finish().unwrap();

        let bytes = sink.into_inner().unwrap();
        let doc = BenchDocument::from_slice(&bytes).unwrap();
        assert_eq!(doc.timing_type, "clock_gettime");

        let memcpy = &doc.functions["memcpy"];
        assert_eq!(memcpy.bench_variant, "default");
        assert_eq!(memcpy.ifuncs, vec!["a", "b"]);
        assert_eq!(memcpy.results.len(), 2);
        assert_eq!(memcpy.results[0].length, 10);
        assert_eq!(memcpy.results[0].align1, 1);
        assert_eq!(memcpy.results[0].align2, 2);
        assert_eq!(memcpy.results[0].timings, vec![Some(4.25), None]);
    }

    #[test]
    fn test_empty_run_is_valid() {
        let mut sink = JsonSink::new(Vec::new());
        sink.begin(&header()).unwrap();
        sink.finish().unwrap();

        let doc = BenchDocument::from_slice(&sink.into_inner().unwrap()).unwrap();
        assert!(doc.functions["memcpy"].results.is_empty());
    }

    #[test]
    fn test_slot_count_checked() {
        let mut sink = JsonSink::new(Vec::new());
        sink.begin(&header()).unwrap();
        sink.begin_case(&TestCase::new(1, 0, 0)).unwrap();
        sink.timing(Some(1.0)).unwrap();
        assert!(matches!(
            sink.end_case(),
            Err(ReportError::SlotCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_unfinished_document_rejected() {
        let mut sink = JsonSink::new(Vec::new());
        sink.begin(&header()).unwrap();
        assert!(sink.into_inner().is_err());
    }
}
