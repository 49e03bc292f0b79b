#![warn(missing_docs)]
//! # Copybench
//!
//! Microbenchmark harness for alignment-sensitive buffer-copy routines.
//!
//! Copybench checks and times several `memcpy`-family implementations over a
//! deterministic matrix of lengths and source/destination alignments:
//! - **Correctness Gate**: every candidate is run once per case against a zeroed
//!   destination; a wrong return value or a single differing byte skips timing
//!   for that pair and fails the run
//! - **Guarded Scratch Buffers**: one owned arena per run, with a `PROT_NONE` page
//!   behind each region so overruns fault
//! - **High-Precision Timing**: RDTSCP / CNTVCT cycle counting with a
//!   `clock_gettime` fallback
//! - **Streaming Output**: JSON result document, CSV or an aligned table,
//!   written one case at a time
//!
//! ## Quick Start
//!
//! ```ignore
//! use copybench::prelude::*;
//!
//! unsafe fn my_memcpy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
//!     unsafe { std::ptr::copy_nonoverlapping(src, dst, len) };
//!     dst
//! }
//!
//! let registry = Registry::builder(Operation::Memcpy)
//!     .baseline("simple_memcpy", simple_memcpy)
//!     .production("my_memcpy", my_memcpy)
//!     .build();
//!
//! let mut driver = Driver::new(registry, DriverConfig::default())?;
//! let mut sink = JsonSink::new(std::io::stdout());
//! let summary = driver.run(&mut sink)?;
//! ```

// Re-export core types
pub use copybench_core::{
    ALIGN_WINDOW, ArenaError, Candidate, CaseView, CopyFn, CorrectnessFailure, FailureKind,
    GateFailure, HAS_CYCLE_COUNTER, INNER_LOOP_ITERS, MIN_BUFFER_SIZE, Measurement, Operation,
    Registry, RegistryBuilder, Role, ScratchBuffers, TestCase, TestMatrix, TimingEngine,
    TimingSource, builtin_memcpy, builtin_mempcpy, check, default_capacity, default_registry,
    libc_memcpy, libc_mempcpy, os_page_size, simple_memcpy, simple_mempcpy, word_memcpy,
};

// Re-export report types
pub use copybench_report::{
    BenchDocument, CaseResult, CsvSink, FunctionResults, HumanSink, JsonSink, JsonWriter,
    OutputFormat, ReportError, ResultSink, RunHeader, sink_for,
};

// Re-export driver types
pub use copybench_cli::{
    BenchConfig, Cli, Commands, Driver, DriverConfig, RunStatus, RunSummary, run_with_cli,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Driver, DriverConfig, JsonSink, Operation, Registry, ResultSink, RunStatus, TestCase,
        TimingSource, default_registry, simple_memcpy, simple_mempcpy,
    };
}

/// Run the copybench CLI harness.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() -> std::process::ExitCode {
///     copybench::run().map(Into::into).unwrap_or(std::process::ExitCode::FAILURE)
/// }
/// ```
pub use copybench_cli::run;
