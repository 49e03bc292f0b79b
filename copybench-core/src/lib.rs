#![warn(missing_docs)]
//! Copybench Core - Measurement Runtime
//!
//! This crate provides everything needed to check and time copy candidates:
//! - Timing sources (cycle counter with monotonic-clock fallback)
//! - The implementation registry and built-in candidates
//! - Guarded scratch buffers with per-case views
//! - The deterministic test matrix
//! - The correctness gate and the fixed-iteration timing engine

mod arena;
mod candidates;
mod engine;
mod gate;
mod matrix;
mod measure;
mod registry;

pub use arena::{
    ALIGN_WINDOW, ArenaError, CaseView, MIN_BUFFER_SIZE, ScratchBuffers, default_capacity,
    os_page_size, scratch_capacity,
};
pub use candidates::{
    builtin_memcpy, builtin_mempcpy, default_registry, libc_memcpy, libc_mempcpy, simple_memcpy,
    simple_mempcpy, word_memcpy,
};
pub use engine::{INNER_LOOP_ITERS, Measurement, TimingEngine};
pub use gate::{CorrectnessFailure, FailureKind, GateFailure, check};
pub use matrix::{TestCase, TestMatrix};
/// Whether this platform provides hardware cycle counters (x86_64 RDTSCP or AArch64 CNTVCT_EL0).
/// When `false`, only the monotonic clock is available.
pub use measure::HAS_CYCLE_COUNTER;
pub use measure::{TimingSource, Timestamp, pin_to_cpu};
pub use registry::{Candidate, CopyFn, Operation, Registry, RegistryBuilder, Role};
