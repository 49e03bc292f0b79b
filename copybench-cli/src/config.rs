//! Configuration loading from copybench.toml
//!
//! Configuration can be specified in a `copybench.toml` file in the project root.
//! The file is discovered by walking up from the current directory; command-line
//! flags override anything it sets.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up during discovery
pub const CONFIG_FILE: &str = "copybench.toml";

/// Copybench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Measurement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timed calls per (candidate, case)
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Timing source: "auto", "hp_timing" or "clock_gettime"
    #[serde(default = "default_timing")]
    pub timing: String,
    /// Pin the measuring thread to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
    /// Scratch buffer capacity in bytes (rounded up to a page multiple)
    #[serde(default)]
    pub buffer_size: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            timing: default_timing(),
            pin_cpu: None,
            buffer_size: None,
        }
    }
}

fn default_iterations() -> u64 {
    copybench_core::INNER_LOOP_ITERS
}
fn default_timing() -> String {
    "auto".to_string()
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "json", "csv" or "human"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output file (stdout if unset)
    #[serde(default)]
    pub path: Option<String>,
    /// Label written as `bench-variant`
    #[serde(default = "default_bench_variant")]
    pub bench_variant: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
            bench_variant: default_bench_variant(),
        }
    }
}

fn default_format() -> String {
    "json".to_string()
}
fn default_bench_variant() -> String {
    "default".to_string()
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(
                            path = %config_path.display(),
                            "ignoring unreadable config: {:#}",
                            e
                        );
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# copybench configuration

[runner]
# Timed calls per (candidate, case)
iterations = 64
# Timing source: "auto", "hp_timing" (cycle counter) or "clock_gettime" (ns)
timing = "auto"
# Pin the measuring thread to a CPU (uncomment to enable)
# pin_cpu = 0
# Scratch buffer capacity in bytes (uncomment to override)
# buffer_size = 131072

[output]
# Output format: json, csv, human
format = "json"
# Output file; stdout when unset (uncomment to enable)
# path = "target/copybench/memcpy.json"
# Label written as "bench-variant"
bench_variant = "default"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.runner.iterations, 64);
        assert_eq!(config.runner.timing, "auto");
        assert_eq!(config.runner.pin_cpu, None);
        assert_eq!(config.output.format, "json");
        assert_eq!(config.output.bench_variant, "default");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            iterations = 1000
            pin_cpu = 2

            [output]
            format = "human"
        "#;

        let config: BenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.iterations, 1000);
        assert_eq!(config.runner.pin_cpu, Some(2));
        assert_eq!(config.output.format, "human");
        // Defaults should still apply
        assert_eq!(config.runner.timing, "auto");
        assert_eq!(config.output.bench_variant, "default");
    }

    #[test]
    fn test_default_toml_parses() {
        let config: BenchConfig = toml::from_str(&BenchConfig::default_toml()).unwrap();
        assert_eq!(config.runner.iterations, 64);
        assert_eq!(config.runner.buffer_size, None);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("copybench-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[runner]\ntiming = \"clock_gettime\"\n").unwrap();

        let config = BenchConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.runner.timing, "clock_gettime");
    }
}
