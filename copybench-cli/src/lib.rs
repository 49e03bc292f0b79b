#![warn(missing_docs)]
//! Copybench CLI Library
//!
//! Command-line front end for the copy harness: configuration layering,
//! candidate selection, logging setup and output routing.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     match copybench_cli::run() {
//!         Ok(status) => status.into(),
//!         Err(err) => {
//!             eprintln!("Error: {err:#}");
//!             std::process::ExitCode::FAILURE
//!         }
//!     }
//! }
//! ```

mod config;
mod driver;
mod metadata;

pub use config::*;
pub use driver::{Driver, DriverConfig, RunStatus, RunSummary};
pub use metadata::RunMetadata;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use copybench_core::{
    Operation, Registry, TestMatrix, TimingSource, default_capacity, default_registry,
    os_page_size, scratch_capacity,
};
use copybench_report::{OutputFormat, sink_for};
use regex::Regex;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Copybench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "copybench")]
#[command(
    author,
    version,
    about = "copybench - alignment-sensitive buffer-copy microbenchmark"
)]
pub struct Cli {
    /// Optional subcommand (Run, List, Cases, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter candidates by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Operation family: memcpy or mempcpy
    #[arg(long, default_value = "memcpy")]
    pub function: String,

    /// Output format: json, csv, human
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Timed calls per (candidate, case)
    #[arg(long, short = 'n')]
    pub iterations: Option<u64>,

    /// Timing source: auto, hp_timing, clock_gettime
    #[arg(long)]
    pub timing: Option<String>,

    /// Pin the measuring thread to this CPU
    #[arg(long)]
    pub pin_cpu: Option<usize>,

    /// Scratch buffer capacity in bytes
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Configuration file (default: discover copybench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only warnings and errors; no progress bar
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the benchmark (default)
    Run,
    /// List registered candidates
    List,
    /// Print the test matrix
    Cases,
    /// Write a default copybench.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Settings resolved from the config file and CLI flags
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Operation family under test
    pub operation: Operation,
    /// Output format
    pub format: OutputFormat,
    /// Output file; stdout when `None`
    pub output: Option<PathBuf>,
    /// Driver settings
    pub driver: DriverConfig,
}

/// Run the copybench CLI with the process arguments.
///
/// # Returns
/// The run status on success, or an error for configuration and I/O problems.
pub fn run() -> anyhow::Result<RunStatus> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the copybench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<RunStatus> {
    init_logging(&cli);

    // copybench.toml first, CLI flags override
    let config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BenchConfig::discover().unwrap_or_default(),
    };

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => run_benchmark(&cli, &config),
        Commands::List => {
            list_candidates(&cli)?;
            Ok(RunStatus::Passed)
        }
        Commands::Cases => {
            list_cases(&cli, &config)?;
            Ok(RunStatus::Passed)
        }
        Commands::Init { force } => {
            write_default_config(force)?;
            Ok(RunStatus::Passed)
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "copybench=debug"
    } else if cli.quiet {
        "copybench=warn"
    } else {
        "copybench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolve a timing source name; `auto` picks the best available clock.
///
/// A cycle counter requested on a platform without one falls back to the
/// monotonic clock with a warning.
pub fn resolve_timing(name: &str) -> anyhow::Result<TimingSource> {
    if name.eq_ignore_ascii_case("auto") {
        return Ok(TimingSource::detect());
    }
    let source: TimingSource = name.parse().map_err(anyhow::Error::msg)?;
    if !source.is_available() {
        tracing::warn!(
            requested = source.name(),
            "timing source unavailable, falling back to {}",
            TimingSource::Monotonic
        );
        return Ok(TimingSource::Monotonic);
    }
    Ok(source)
}

/// Layer CLI flags over the config file.
pub fn build_settings(cli: &Cli, config: &BenchConfig) -> anyhow::Result<RunSettings> {
    let operation: Operation = cli.function.parse().map_err(anyhow::Error::msg)?;
    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(config.output.format.as_str())
        .parse()
        .map_err(anyhow::Error::msg)?;
    let output = cli
        .output
        .clone()
        .or_else(|| config.output.path.as_ref().map(PathBuf::from));
    let timing = resolve_timing(cli.timing.as_deref().unwrap_or(config.runner.timing.as_str()))?;

    let iterations = cli.iterations.unwrap_or(config.runner.iterations);
    if iterations == 0 {
        bail!("iterations must be at least 1");
    }

    Ok(RunSettings {
        operation,
        format,
        output,
        driver: DriverConfig {
            timing,
            iterations,
            buffer_size: cli.buffer_size.or(config.runner.buffer_size),
            page_size: os_page_size(),
            bench_variant: config.output.bench_variant.clone(),
            pin_cpu: cli.pin_cpu.or(config.runner.pin_cpu),
            progress: !cli.quiet,
        },
    })
}

/// Keep the candidates whose names match `filter`.
pub fn select_candidates(registry: &Registry, filter: &str) -> anyhow::Result<Registry> {
    let re = Regex::new(filter).with_context(|| format!("invalid filter '{}'", filter))?;
    let selected = registry.retain_names(|name| re.is_match(name));
    if selected.is_empty() {
        bail!(
            "no candidate matches '{}' (available: {})",
            filter,
            registry.names().join(", ")
        );
    }
    Ok(selected)
}

fn list_candidates(cli: &Cli) -> anyhow::Result<()> {
    let operation: Operation = cli.function.parse().map_err(anyhow::Error::msg)?;
    let registry = select_candidates(&default_registry(operation), &cli.filter)?;

    println!("copybench candidates ({}):", operation);
    for candidate in &registry {
        println!("├── {} [{}]", candidate.name(), candidate.role());
    }
    println!("{} candidates found.", registry.len());
    Ok(())
}

/// Matrix a run with this buffer size would use, without allocating buffers.
pub fn case_matrix(buffer_size: Option<usize>, page_size: usize) -> anyhow::Result<TestMatrix> {
    let requested = buffer_size.unwrap_or_else(|| default_capacity(page_size));
    let capacity = scratch_capacity(requested, page_size)
        .with_context(|| format!("invalid buffer size {}", requested))?;
    Ok(TestMatrix::new(capacity, page_size))
}

fn list_cases(cli: &Cli, config: &BenchConfig) -> anyhow::Result<()> {
    let page_size = os_page_size();
    let matrix = case_matrix(cli.buffer_size.or(config.runner.buffer_size), page_size)?;
    let capacity = matrix.capacity();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{:>8}  {:>6}  {:>6}", "length", "align1", "align2")?;
    for case in matrix.cases() {
        writeln!(
            out,
            "{:>8}  {:>6}  {:>6}",
            case.length, case.align_src, case.align_dst
        )?;
    }
    writeln!(
        out,
        "{} cases (capacity {}, page size {}).",
        matrix.len(),
        capacity,
        page_size
    )?;
    Ok(())
}

fn write_default_config(force: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(&path, BenchConfig::default_toml())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_benchmark(cli: &Cli, config: &BenchConfig) -> anyhow::Result<RunStatus> {
    let settings = build_settings(cli, config)?;
    let registry = select_candidates(&default_registry(settings.operation), &cli.filter)?;
    let page_size = settings.driver.page_size;

    let mut driver = Driver::new(registry, settings.driver.clone())?;
    RunMetadata::collect(page_size, driver.capacity()).log();
    tracing::info!(
        operation = %settings.operation,
        candidates = driver.registry().len(),
        cases = driver.matrix().len(),
        timing = driver.engine().source().name(),
        iterations = driver.engine().iterations(),
        "starting run"
    );

    let summary = match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut sink = sink_for(settings.format, BufWriter::new(file));
            let summary = driver.run(sink.as_mut())?;
            eprintln!("Results written to: {}", path.display());
            summary
        }
        None => {
            let stdout = std::io::stdout();
            let mut sink = sink_for(settings.format, stdout.lock());
            driver.run(sink.as_mut())?
        }
    };

    if !summary.passed() {
        eprintln!("\n{} correctness failure(s):", summary.failures.len());
        for failure in &summary.failures {
            eprintln!(
                "  {} length={} align1={} align2={}: {}",
                failure.implementation,
                failure.case.length,
                failure.case.align_src,
                failure.case.align_dst,
                failure.failure
            );
        }
    }

    Ok(summary.status())
}
