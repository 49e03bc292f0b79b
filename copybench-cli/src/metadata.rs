//! System Metadata Collection
//!
//! Collects host details logged at the start of a run so a result file can be
//! traced back to the machine that produced it.
//!
//! Linux-specific data (CPU model) gracefully degrades on other platforms.

use chrono::{DateTime, Utc};

/// Host and run details
#[derive(Debug, Clone)]
pub struct RunMetadata {
    /// Crate version
    pub version: &'static str,
    /// UTC start time
    pub timestamp: DateTime<Utc>,
    /// Operating system
    pub os: &'static str,
    /// CPU architecture
    pub arch: &'static str,
    /// CPU model name
    pub cpu: String,
    /// Available cores
    pub cpu_cores: u32,
    /// OS page size
    pub page_size: usize,
    /// Scratch buffer capacity
    pub buffer_capacity: usize,
}

impl RunMetadata {
    /// Collect metadata for the current host
    pub fn collect(page_size: usize, buffer_capacity: usize) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: num_cpus(),
            page_size,
            buffer_capacity,
        }
    }

    /// Emit as a structured log record
    pub fn log(&self) {
        tracing::info!(
            version = self.version,
            timestamp = %self.timestamp.to_rfc3339(),
            os = self.os,
            arch = self.arch,
            cpu = %self.cpu,
            cores = self.cpu_cores,
            page_size = self.page_size,
            buffer_capacity = self.buffer_capacity,
            "host"
        );
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Get number of available CPU cores
fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}
