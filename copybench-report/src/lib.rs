#![warn(missing_docs)]
//! Copybench Report - Streaming Result Output
//!
//! Generates the run output incrementally, one case at a time:
//! - JSON (the result document consumed by analysis tooling)
//! - CSV (spreadsheet-compatible)
//! - Human (aligned terminal table)

mod csv;
mod document;
mod human;
mod json;
mod sink;
mod writer;

pub use csv::CsvSink;
pub use document::{BenchDocument, CaseResult, FunctionResults};
pub use human::HumanSink;
pub use json::JsonSink;
pub use sink::{ReportError, ResultSink, RunHeader};
pub use writer::JsonWriter;

use std::io::Write;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON result document
    Json,
    /// CSV for spreadsheets
    Csv,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Build the sink for `format` writing to `out`
pub fn sink_for<'a, W: Write + 'a>(format: OutputFormat, out: W) -> Box<dyn ResultSink + 'a> {
    match format {
        OutputFormat::Json => Box::new(JsonSink::new(out)),
        OutputFormat::Csv => Box::new(CsvSink::new(out)),
        OutputFormat::Human => Box::new(HumanSink::new(out)),
    }
}
