//! Configuration loading from scalebench.toml
//!
//! The experiment matrix, binaries and runner limits are static
//! configuration. They can be given in a `scalebench.toml` file, discovered
//! by walking up from the current directory, and every field can be
//! overridden from the command line. Missing fields fall back to the
//! defaults of the original benchmark suite.
//!
//! [`BenchConfig`] is the raw, serde-facing shape. [`BenchConfig::plan`]
//! validates it into an immutable [`BenchPlan`] that the orchestrator owns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::experiment::Synchronization;
use crate::{Error, Result};

/// File name looked up by [`BenchConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "scalebench.toml";

/// scalebench configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Counter executables
    #[serde(default)]
    pub binaries: BinariesConfig,
    /// Experiment matrix
    #[serde(default)]
    pub matrix: MatrixConfig,
    /// Runner limits
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Result store location
    #[serde(default)]
    pub output: OutputConfig,
}

/// Counter executables under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinariesConfig {
    /// Sequential counter: `<sequential> <input>`
    #[serde(default = "default_sequential")]
    pub sequential: PathBuf,
    /// Parallel counter: `<parallel> <input> <output> <top_n> <threads> <sync>`
    #[serde(default = "default_parallel")]
    pub parallel: PathBuf,
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            sequential: default_sequential(),
            parallel: default_parallel(),
        }
    }
}

fn default_sequential() -> PathBuf {
    PathBuf::from("build/sequential_counter")
}
fn default_parallel() -> PathBuf {
    PathBuf::from("build/parallel_counter")
}

/// Experiment matrix: datasets x thread counts x strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Dataset input paths, in reporting order
    #[serde(default = "default_datasets")]
    pub datasets: Vec<String>,
    /// Thread counts (sorted ascending when planned)
    #[serde(default = "default_thread_counts")]
    pub thread_counts: Vec<u32>,
    /// Synchronization strategies, in reporting order
    #[serde(default = "default_sync_strategies")]
    pub sync_strategies: Vec<Synchronization>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            thread_counts: default_thread_counts(),
            sync_strategies: default_sync_strategies(),
        }
    }
}

fn default_datasets() -> Vec<String> {
    ["10mb", "25mb", "50mb", "100mb"]
        .iter()
        .map(|size| format!("data/test_{size}.txt"))
        .collect()
}
fn default_thread_counts() -> Vec<u32> {
    vec![1, 2, 4, 8]
}
fn default_sync_strategies() -> Vec<Synchronization> {
    Synchronization::PARALLEL.to_vec()
}

/// Runner configuration for trial execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Trials per matrix cell
    #[serde(default = "default_runs")]
    pub runs: u32,
    /// Timeout for a single trial (e.g., "300s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// `top_n` argument passed to the parallel counter
    #[serde(default = "default_top_n")]
    pub top_n: u32,
    /// Directory receiving the parallel counter's per-cell output files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Extra dynamic-library directories for the counter (`${VAR}` prefixes expanded)
    #[serde(default)]
    pub library_paths: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            timeout: default_timeout(),
            top_n: default_top_n(),
            output_dir: default_output_dir(),
            library_paths: Vec::new(),
        }
    }
}

fn default_runs() -> u32 {
    5
}
fn default_timeout() -> String {
    "300s".to_string()
}
fn default_top_n() -> u32 {
    100
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("results/parallel")
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding experiment records and their projections
    #[serde(default = "default_results_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_results_dir(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("benchmarks/results")
}

impl BenchConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Try to discover and load configuration by walking up from current directory
    ///
    /// # Errors
    ///
    /// Returns an error only if a discovered file fails to load; no file at
    /// all yields `Ok(None)`.
    pub fn discover() -> Result<Option<Self>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Self::load(&config_path).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Validate into an immutable plan.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when runs is zero, the thread list is
    /// empty or contains zero, the strategy list is empty or contains the
    /// sequential sentinel, or the timeout is not a positive duration.
    pub fn plan(&self) -> Result<BenchPlan> {
        if self.runner.runs == 0 {
            return Err(Error::InvalidConfig("runs must be at least 1".into()));
        }
        if self.matrix.thread_counts.is_empty() {
            return Err(Error::InvalidConfig("thread_counts must not be empty".into()));
        }
        if self.matrix.thread_counts.contains(&0) {
            return Err(Error::InvalidConfig("thread counts must be at least 1".into()));
        }
        if self.matrix.sync_strategies.is_empty() {
            return Err(Error::InvalidConfig("sync_strategies must not be empty".into()));
        }
        if self
            .matrix
            .sync_strategies
            .iter()
            .any(|s| s.is_sequential())
        {
            return Err(Error::InvalidConfig(
                "'sequential' is the baseline sentinel, not a parallel strategy".into(),
            ));
        }

        let timeout = parse_duration(&self.runner.timeout)?;
        if timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }

        let mut thread_counts = self.matrix.thread_counts.clone();
        thread_counts.sort_unstable();
        thread_counts.dedup();

        let mut sync_strategies: Vec<Synchronization> = Vec::new();
        for sync in &self.matrix.sync_strategies {
            if !sync_strategies.contains(sync) {
                sync_strategies.push(*sync);
            }
        }

        Ok(BenchPlan {
            datasets: self.matrix.datasets.clone(),
            thread_counts,
            sync_strategies,
            runs: self.runner.runs,
            timeout,
            top_n: self.runner.top_n,
            binaries: self.binaries.clone(),
            output_dir: self.runner.output_dir.clone(),
            library_paths: self.runner.library_paths.clone(),
            results_dir: self.output.directory.clone(),
        })
    }

    /// Generate a default configuration as TOML string
    #[must_use]
    pub fn default_toml() -> String {
        r#"# scalebench configuration

[binaries]
# Sequential counter, invoked as: <sequential> <input>
sequential = "build/sequential_counter"
# Parallel counter, invoked as: <parallel> <input> <output> <top_n> <threads> <sync>
parallel = "build/parallel_counter"

[matrix]
# Dataset inputs, in reporting order
datasets = ["data/test_10mb.txt", "data/test_25mb.txt", "data/test_50mb.txt", "data/test_100mb.txt"]
# Thread counts (run in ascending order)
thread_counts = [1, 2, 4, 8]
# Synchronization strategies: reduction, atomic, critical
sync_strategies = ["reduction", "atomic", "critical"]

[runner]
# Trials per matrix cell
runs = 5
# Timeout for a single trial
timeout = "300s"
# Top-N argument for the parallel counter
top_n = 100
# Per-cell output files of the parallel counter
output_dir = "results/parallel"
# Extra shared-library directories, e.g. ["${MINGW_HOME}/bin"]
library_paths = []

[output]
# Experiment records and projections
directory = "benchmarks/results"
"#
        .to_string()
    }
}

/// Validated, immutable orchestration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPlan {
    datasets: Vec<String>,
    thread_counts: Vec<u32>,
    sync_strategies: Vec<Synchronization>,
    runs: u32,
    timeout: Duration,
    top_n: u32,
    binaries: BinariesConfig,
    output_dir: PathBuf,
    library_paths: Vec<String>,
    results_dir: PathBuf,
}

impl BenchPlan {
    /// Datasets in configured order.
    #[must_use]
    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    /// Thread counts, ascending and unique.
    #[must_use]
    pub fn thread_counts(&self) -> &[u32] {
        &self.thread_counts
    }

    /// Strategies in configured order, unique.
    #[must_use]
    pub fn sync_strategies(&self) -> &[Synchronization] {
        &self.sync_strategies
    }

    /// Trials per cell.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Per-trial timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `top_n` argument of the parallel counter.
    #[must_use]
    pub const fn top_n(&self) -> u32 {
        self.top_n
    }

    /// Counter executables.
    #[must_use]
    pub const fn binaries(&self) -> &BinariesConfig {
        &self.binaries
    }

    /// Output directory of the parallel counter.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Extra library directories for the provisioner.
    #[must_use]
    pub fn library_paths(&self) -> &[String] {
        &self.library_paths
    }

    /// Result store directory.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Total trial count of a full run, skipped datasets included.
    #[must_use]
    pub fn total_trials(&self) -> usize {
        self.datasets.len()
            * (1 + self.thread_counts.len() * self.sync_strategies.len())
            * self.runs as usize
    }
}

/// Parse duration string (e.g., "300s", "500ms", "5m") into a [`Duration`]
///
/// A bare number is read as seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for empty input, a malformed number, or
/// an unknown unit.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidConfig("empty duration string".into()));
    }

    // Find where the number ends and unit begins
    let (num_part, unit_part) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map_or((s, "s"), |(i, _)| s.split_at(i));

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid duration number: {num_part}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidConfig(format!("invalid duration: {s}")));
    }

    let nanos_per_unit: u64 = match unit_part.to_lowercase().as_str() {
        "ns" => 1,
        "us" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" | "min" => 60_000_000_000,
        other => {
            return Err(Error::InvalidConfig(format!("unknown duration unit: {other}")))
        }
    };

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let nanos = (value * nanos_per_unit as f64) as u64;
    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.runner.runs, 5);
        assert_eq!(config.runner.timeout, "300s");
        assert_eq!(config.matrix.thread_counts, vec![1, 2, 4, 8]);
        assert_eq!(config.matrix.datasets.len(), 4);
        assert_eq!(config.matrix.datasets[0], "data/test_10mb.txt");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("300s").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("100us").unwrap(), Duration::from_micros(100));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3 fortnights").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [matrix]
            datasets = ["a.txt"]
            sync_strategies = ["critical", "atomic"]

            [runner]
            runs = 3
        "#;

        let config = BenchConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.matrix.datasets, vec!["a.txt"]);
        assert_eq!(
            config.matrix.sync_strategies,
            vec![Synchronization::Critical, Synchronization::Atomic]
        );
        assert_eq!(config.runner.runs, 3);
        // Defaults should still apply
        assert_eq!(config.matrix.thread_counts, vec![1, 2, 4, 8]);
        assert_eq!(config.runner.timeout, "300s");
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let toml_str = r#"
            [matrix]
            sync_strategies = ["spinlock"]
        "#;
        assert!(BenchConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_default_toml_parses() {
        let config = BenchConfig::from_toml(&BenchConfig::default_toml()).unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn test_plan_sorts_threads_keeps_strategy_order() {
        let mut config = BenchConfig::default();
        config.matrix.thread_counts = vec![8, 2, 4, 2];
        config.matrix.sync_strategies =
            vec![Synchronization::Critical, Synchronization::Reduction, Synchronization::Critical];

        let plan = config.plan().unwrap();
        assert_eq!(plan.thread_counts(), &[2, 4, 8]);
        assert_eq!(
            plan.sync_strategies(),
            &[Synchronization::Critical, Synchronization::Reduction]
        );
        assert_eq!(plan.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_plan_rejects_invalid() {
        let mut config = BenchConfig::default();
        config.runner.runs = 0;
        assert!(matches!(config.plan(), Err(Error::InvalidConfig(_))));

        let mut config = BenchConfig::default();
        config.matrix.thread_counts = vec![0, 2];
        assert!(config.plan().is_err());

        let mut config = BenchConfig::default();
        config.matrix.sync_strategies = vec![Synchronization::Sequential];
        assert!(config.plan().is_err());

        let mut config = BenchConfig::default();
        config.runner.timeout = "0s".into();
        assert!(config.plan().is_err());
    }

    #[test]
    fn test_total_trials_matches_original_suite() {
        // 4 datasets x (1 + 4 threads x 3 strategies) x 5 runs
        let plan = BenchConfig::default().plan().unwrap();
        assert_eq!(plan.total_trials(), 4 * 13 * 5);
    }
}
