//! Run Orchestration
//!
//! The driver owns the scratch buffers for the whole run and walks the test
//! matrix case by case:
//!
//! ```text
//! TestMatrix ──▶ case ──▶ fill source ──▶ for each candidate:
//!                                           gate ──pass──▶ timing ──▶ sink.timing(Some)
//!                                             └──fail──▶ record ───▶ sink.timing(None)
//! ```
//!
//! A correctness failure never aborts the run; it is recorded in the
//! [`RunSummary`] and turns the final status into [`RunStatus::Failed`].

use anyhow::Context;
use copybench_core::{
    CorrectnessFailure, INNER_LOOP_ITERS, Registry, ScratchBuffers, TestCase, TestMatrix,
    TimingEngine, TimingSource, check, default_capacity, os_page_size, pin_to_cpu,
};
use copybench_report::{ResultSink, RunHeader};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;

/// Settings for one run
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Clock used for measurements
    pub timing: TimingSource,
    /// Timed calls per (candidate, case)
    pub iterations: u64,
    /// Scratch capacity override; defaults to `max(2 * page, 128 KiB)`
    pub buffer_size: Option<usize>,
    /// OS page size, queried once
    pub page_size: usize,
    /// Label written as `bench-variant`
    pub bench_variant: String,
    /// Pin the measuring thread before the first case
    pub pin_cpu: Option<usize>,
    /// Show a progress bar on stderr
    pub progress: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            timing: TimingSource::detect(),
            iterations: INNER_LOOP_ITERS,
            buffer_size: None,
            page_size: os_page_size(),
            bench_variant: "default".to_string(),
            pin_cpu: None,
            progress: false,
        }
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every correctness check passed
    Passed,
    /// At least one candidate failed the gate
    Failed,
}

impl RunStatus {
    /// Whether the run passed
    pub fn is_success(self) -> bool {
        self == RunStatus::Passed
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Passed => ExitCode::SUCCESS,
            RunStatus::Failed => ExitCode::FAILURE,
        }
    }
}

/// What happened during a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Cases emitted (after filtering)
    pub cases: usize,
    /// (candidate, case) pairs that were timed
    pub measurements: usize,
    /// Out-of-range cases that were dropped
    pub dropped: usize,
    /// Every gate failure, in run order
    pub failures: Vec<CorrectnessFailure>,
}

impl RunSummary {
    /// True when no correctness failure was recorded
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Final status
    pub fn status(&self) -> RunStatus {
        if self.passed() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        }
    }
}

/// Owns the candidates, the scratch buffers and the timing engine for a run
#[derive(Debug)]
pub struct Driver {
    registry: Registry,
    engine: TimingEngine,
    buffers: ScratchBuffers,
    matrix: TestMatrix,
    config: DriverConfig,
}

impl Driver {
    /// Allocate the scratch buffers and build the matrix for `registry`
    pub fn new(registry: Registry, config: DriverConfig) -> anyhow::Result<Self> {
        let requested = config
            .buffer_size
            .unwrap_or_else(|| default_capacity(config.page_size));
        let buffers = ScratchBuffers::new(requested, config.page_size)
            .with_context(|| format!("allocating {} byte scratch buffers", requested))?;
        let matrix = TestMatrix::new(buffers.capacity(), config.page_size);
        let engine = TimingEngine::new(config.timing, config.iterations);

        Ok(Self {
            registry,
            engine,
            buffers,
            matrix,
            config,
        })
    }

    /// Candidates in run order
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Matrix the driver runs by default
    pub fn matrix(&self) -> &TestMatrix {
        &self.matrix
    }

    /// Usable bytes in each scratch buffer
    pub fn capacity(&self) -> usize {
        self.buffers.capacity()
    }

    /// Timing engine in use
    pub fn engine(&self) -> &TimingEngine {
        &self.engine
    }

    /// Run every case of the matrix
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> anyhow::Result<RunSummary> {
        let total = self.matrix.len();
        let cases = self.matrix.cases();
        self.execute(sink, cases, total)
    }

    /// Run an explicit case list; cases that do not fit the buffers are dropped
    pub fn run_cases(
        &mut self,
        sink: &mut dyn ResultSink,
        cases: &[TestCase],
    ) -> anyhow::Result<RunSummary> {
        self.execute(sink, cases.iter().copied(), cases.len())
    }

    fn execute(
        &mut self,
        sink: &mut dyn ResultSink,
        cases: impl Iterator<Item = TestCase>,
        total: usize,
    ) -> anyhow::Result<RunSummary> {
        if let Some(cpu) = self.config.pin_cpu {
            pin_to_cpu(cpu).with_context(|| format!("pinning to CPU {}", cpu))?;
            tracing::info!(cpu, "pinned measuring thread");
        }

        let operation = self.registry.operation();
        let source = self.engine.source();
        let header = RunHeader {
            timing_type: source.name().to_string(),
            unit: source.unit().to_string(),
            operation: operation.name().to_string(),
            bench_variant: self.config.bench_variant.clone(),
            ifuncs: self.registry.names(),
        };
        sink.begin(&header).context("writing result header")?;

        let pb = progress_bar(total as u64, self.config.progress);
        let mut summary = RunSummary::default();

        for case in cases {
            let Some(mut view) = self.buffers.view(&case) else {
                tracing::debug!(
                    length = case.length,
                    align1 = case.align_src,
                    align2 = case.align_dst,
                    "case exceeds scratch capacity, dropped"
                );
                summary.dropped += 1;
                pb.inc(1);
                continue;
            };
            pb.set_message(format!("length {}", case.length));

            view.fill_source();
            sink.begin_case(&case)?;

            for candidate in &self.registry {
                match check(operation, candidate, &mut view) {
                    Ok(()) => {
                        let measurement = self.engine.measure(candidate, case, &mut view);
                        summary.measurements += 1;
                        sink.timing(Some(measurement.per_iteration))?;
                    }
                    Err(failure) => {
                        tracing::error!(
                            implementation = candidate.name(),
                            length = case.length,
                            align1 = case.align_src,
                            align2 = case.align_dst,
                            "{}",
                            failure
                        );
                        summary.failures.push(CorrectnessFailure {
                            implementation: candidate.name().to_string(),
                            case,
                            failure,
                        });
                        sink.timing(None)?;
                    }
                }
            }

            sink.end_case()?;
            summary.cases += 1;
            pb.inc(1);
        }

        sink.finish().context("finishing result output")?;
        pb.finish_and_clear();

        tracing::info!(
            cases = summary.cases,
            measurements = summary.measurements,
            failures = summary.failures.len(),
            "run complete"
        );
        Ok(summary)
    }
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use copybench_core::{Operation, default_registry};
    use copybench_report::{BenchDocument, JsonSink};

    fn config() -> DriverConfig {
        DriverConfig {
            timing: TimingSource::Monotonic,
            iterations: 2,
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_explicit_cases() {
        let registry = default_registry(Operation::Memcpy);
        let ifuncs = registry.len();
        let mut driver = Driver::new(registry, config()).unwrap();

        let cases = [TestCase::new(0, 0, 0), TestCase::new(100, 3, 7)];
        let mut sink = JsonSink::new(Vec::new());
        let summary = driver.run_cases(&mut sink, &cases).unwrap();

        assert!(summary.passed());
        assert_eq!(summary.status(), RunStatus::Passed);
        assert_eq!(summary.cases, 2);
        assert_eq!(summary.measurements, 2 * ifuncs);

        let doc = BenchDocument::from_slice(&sink.into_inner().unwrap()).unwrap();
        assert_eq!(doc.timing_type, "clock_gettime");
        let memcpy = &doc.functions["memcpy"];
        assert_eq!(memcpy.case_parameters(), vec![(0, 0, 0), (100, 3, 7)]);
        assert!(memcpy.results.iter().all(|r| r.timings.iter().all(Option::is_some)));
    }

    #[test]
    fn test_oversized_case_dropped() {
        let mut driver = Driver::new(default_registry(Operation::Mempcpy), config()).unwrap();
        let capacity = driver.capacity();

        let cases = [TestCase::new(capacity, 0, 0), TestCase::new(16, 1, 2)];
        let mut sink = JsonSink::new(Vec::new());
        let summary = driver.run_cases(&mut sink, &cases).unwrap();

        assert_eq!(summary.cases, 1);
        assert_eq!(summary.dropped, 1);
        let doc = BenchDocument::from_slice(&sink.into_inner().unwrap()).unwrap();
        assert_eq!(doc.functions["mempcpy"].case_parameters(), vec![(16, 1, 2)]);
    }

    #[test]
    fn test_buffer_override_rounds_to_page() {
        let page = os_page_size();
        let driver = Driver::new(
            default_registry(Operation::Memcpy),
            DriverConfig {
                buffer_size: Some(page + 1),
                ..config()
            },
        )
        .unwrap();

        assert_eq!(driver.capacity(), 2 * page);
        assert_eq!(driver.matrix().capacity(), 2 * page);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_out_of_range_pin_is_an_error() {
        let mut driver = Driver::new(
            default_registry(Operation::Memcpy),
            DriverConfig {
                pin_cpu: Some(5000),
                ..config()
            },
        )
        .unwrap();

        let mut sink = JsonSink::new(Vec::new());
        let err = driver
            .run_cases(&mut sink, &[TestCase::new(8, 0, 0)])
            .unwrap_err();
        assert!(format!("{:#}", err).contains("pinning to CPU 5000"));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert!(RunStatus::Passed.is_success());
        assert!(!RunStatus::Failed.is_success());
        let summary = RunSummary::default();
        assert_eq!(summary.status(), RunStatus::Passed);
    }
}
