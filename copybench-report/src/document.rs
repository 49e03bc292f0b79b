//! Result Document Model
//!
//! Read-side view of the JSON document written by [`JsonSink`](crate::JsonSink).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed result document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchDocument {
    /// Timing source identifier
    pub timing_type: String,
    /// Results keyed by operation name
    pub functions: BTreeMap<String, FunctionResults>,
}

/// Results for one operation family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResults {
    /// Run label
    #[serde(rename = "bench-variant")]
    pub bench_variant: String,
    /// Candidate names; index `i` matches `timings[i]` of every case
    pub ifuncs: Vec<String>,
    /// Cases in run order
    pub results: Vec<CaseResult>,
}

/// Timings for one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Bytes copied
    pub length: usize,
    /// Source alignment
    pub align1: usize,
    /// Destination alignment
    pub align2: usize,
    /// Per-candidate timing; `None` when the candidate was skipped
    pub timings: Vec<Option<f64>>,
}

impl BenchDocument {
    /// Parse a document from bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Parse a document from a reader
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}

impl FunctionResults {
    /// `(length, align1, align2)` of every case, in order
    pub fn case_parameters(&self) -> Vec<(usize, usize, usize)> {
        self.results
            .iter()
            .map(|r| (r.length, r.align1, r.align2))
            .collect()
    }

    /// Number of skipped slots per candidate
    pub fn skipped_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.ifuncs.len()];
        for result in &self.results {
            for (count, timing) in counts.iter_mut().zip(&result.timings) {
                if timing.is_none() {
                    *count += 1;
                }
            }
        }
        counts
    }
}

impl CaseResult {
    /// Index of the fastest candidate for this case
    pub fn fastest(&self) -> Option<usize> {
        crate::sink::fastest(&self.timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "timing_type": "hp_timing",
        "functions": {
            "memcpy": {
                "bench-variant": "default",
                "ifuncs": ["simple", "fast"],
                "results": [
                    {"length": 8, "align1": 0, "align2": 3, "timings": [40.5, 9.0]},
                    {"length": 16, "align1": 1, "align2": 1, "timings": [null, 11.25]}
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let doc = BenchDocument::from_slice(SAMPLE.as_bytes()).unwrap();
        let memcpy = &doc.functions["memcpy"];
        assert_eq!(memcpy.case_parameters(), vec![(8, 0, 3), (16, 1, 1)]);
        assert_eq!(memcpy.skipped_counts(), vec![1, 0]);
        assert_eq!(memcpy.results[0].fastest(), Some(1));
        assert_eq!(memcpy.results[1].fastest(), Some(1));
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(BenchDocument::from_slice(br#"{"functions": {}}"#).is_err());
    }
}
