//! Result Sinks
//!
//! The driver streams results through [`ResultSink`]: one header, then per
//! case its parameters followed by one timing slot per candidate in registry
//! order, then `finish`. A slot is `None` when the candidate was skipped
//! because it failed the correctness gate.

use copybench_core::TestCase;
use thiserror::Error;

/// Errors raised while emitting results
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing to the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// An end call with nothing open, or a finish with levels still open
    #[error("unbalanced document: expected {expected} with {open} level(s) open")]
    Unbalanced {
        /// What the call tried to close
        expected: &'static str,
        /// Levels open at the time
        open: usize,
    },

    /// An end call that does not match the innermost open level
    #[error("mismatched end: closing {expected} but innermost level is {found}")]
    Mismatched {
        /// Level the call tried to close
        expected: &'static str,
        /// Level actually open
        found: &'static str,
    },

    /// An attribute outside an object or an element outside an array
    #[error("misplaced write: {0}")]
    Misplaced(&'static str),

    /// A case ended with the wrong number of timing values
    #[error("expected {expected} timing slot(s) for case, got {actual}")]
    SlotCount {
        /// One per registered candidate
        expected: usize,
        /// Values written
        actual: usize,
    },
}

/// Run-level information written before any case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHeader {
    /// Timing source identifier (`hp_timing`, `clock_gettime`)
    pub timing_type: String,
    /// Unit of the timing values (`cycles`, `ns`)
    pub unit: String,
    /// Operation family name (`memcpy`, `mempcpy`)
    pub operation: String,
    /// Free-form label distinguishing runs of the same operation
    pub bench_variant: String,
    /// Candidate names in registry order
    pub ifuncs: Vec<String>,
}

/// Streaming consumer of benchmark results
pub trait ResultSink {
    /// Write the run header
    fn begin(&mut self, header: &RunHeader) -> Result<(), ReportError>;

    /// Start a case
    fn begin_case(&mut self, case: &TestCase) -> Result<(), ReportError>;

    /// Append the next candidate's result for the current case
    fn timing(&mut self, value: Option<f64>) -> Result<(), ReportError>;

    /// Close the current case
    fn end_case(&mut self) -> Result<(), ReportError>;

    /// Close the document and flush
    fn finish(&mut self) -> Result<(), ReportError>;
}

/// Index of the smallest present timing, if any
pub(crate) fn fastest(timings: &[Option<f64>]) -> Option<usize> {
    timings
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.map(|t| (i, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
