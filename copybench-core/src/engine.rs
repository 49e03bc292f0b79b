//! Timing Engine
//!
//! Runs a candidate back to back a fixed number of times between one pair of
//! timestamps and reports the average cost per call. There is no warmup and
//! no per-iteration reset: a single averaged shot per (candidate, case).

use crate::arena::CaseView;
use crate::matrix::TestCase;
use crate::measure::TimingSource;
use crate::registry::Candidate;
use std::hint::black_box;

/// Default number of timed calls per (candidate, case)
pub const INNER_LOOP_ITERS: u64 = 64;

/// Average cost of one candidate on one case
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement<'r> {
    /// Case that was timed
    pub case: TestCase,
    /// Candidate name
    pub implementation: &'r str,
    /// Average ticks per call, in the unit of `source`
    pub per_iteration: f64,
    /// Clock the ticks came from
    pub source: TimingSource,
}

impl Measurement<'_> {
    /// Average seconds per call, when the source counts nanoseconds
    pub fn seconds_per_iteration(&self) -> Option<f64> {
        match self.source {
            TimingSource::Monotonic => Some(self.per_iteration * 1e-9),
            TimingSource::Cycles => None,
        }
    }
}

/// Fixed-iteration timing loop
#[derive(Debug, Clone, Copy)]
pub struct TimingEngine {
    source: TimingSource,
    iterations: u64,
}

impl TimingEngine {
    /// Create an engine; `iterations` is clamped to at least one
    pub fn new(source: TimingSource, iterations: u64) -> Self {
        Self {
            source,
            iterations: iterations.max(1),
        }
    }

    /// Clock used for measurements
    pub fn source(&self) -> TimingSource {
        self.source
    }

    /// Calls per measurement
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Time `candidate` on `view`.
    ///
    /// The candidate must already have passed the correctness gate for `case`.
    pub fn measure<'r>(
        &self,
        candidate: &'r Candidate,
        case: TestCase,
        view: &mut CaseView<'_>,
    ) -> Measurement<'r> {
        let dst = view.dst_ptr();
        let src = view.src_ptr();
        let len = view.len();

        let start = self.source.now();
        for _ in 0..self.iterations {
            // SAFETY: the view's pointers cover `len` bytes in separate regions.
            black_box(unsafe { candidate.call(black_box(dst), black_box(src), black_box(len)) });
        }
        let stop = self.source.now();

        let ticks = stop.ticks_since(&start);
        let per_iteration = ticks as f64 / self.iterations as f64;

        tracing::debug!(
            implementation = candidate.name(),
            length = case.length,
            align1 = case.align_src,
            align2 = case.align_dst,
            per_iteration,
            unit = self.source.unit(),
            "measured"
        );

        Measurement {
            case,
            implementation: candidate.name(),
            per_iteration,
            source: self.source,
        }
    }
}

impl Default for TimingEngine {
    fn default() -> Self {
        Self::new(TimingSource::detect(), INNER_LOOP_ITERS)
    }
}
