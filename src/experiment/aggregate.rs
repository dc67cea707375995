//! Aggregate Result - one reduced matrix cell

use serde::{Deserialize, Serialize};

use super::{ExperimentConfig, SampleSet, WordCounts};
use crate::stats::Statistics;

/// Speedup and efficiency of a cell relative to its dataset's baseline.
///
/// Both are `0.0` when the cell is incomparable (no usable baseline, or no
/// successful samples of its own).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// `baseline.mean / result.mean`
    pub speedup: f64,
    /// `speedup / threads * 100`, not clamped
    pub efficiency: f64,
}

impl DerivedMetrics {
    /// Sentinel for cells that cannot be compared.
    pub const INCOMPARABLE: Self = Self {
        speedup: 0.0,
        efficiency: 0.0,
    };

    /// Metrics of a baseline compared against itself.
    pub const IDENTITY: Self = Self {
        speedup: 1.0,
        efficiency: 100.0,
    };

    /// Whether this is the incomparable sentinel.
    #[must_use]
    pub fn is_incomparable(&self) -> bool {
        self.speedup == 0.0 && self.efficiency == 0.0
    }
}

/// Aggregate Result holds the reduced statistics of one matrix cell.
///
/// Elapsed-time statistics come only from successful samples. Word counts
/// are those of the last successful sample. Derived metrics stay `None`
/// until the baseline join.
///
/// Serialized as one flat object per cell (`dataset`, `threads`,
/// `sync_method`, `mean_time`, ..., `speedup`, `efficiency`), which is the
/// row shape tabular consumers load directly. Underived metrics are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(flatten)]
    config: ExperimentConfig,
    #[serde(flatten)]
    statistics: Statistics,
    times: Vec<f64>,
    total_words: u64,
    unique_words: u64,
    attempted: usize,
    #[serde(flatten)]
    metrics: Option<DerivedMetrics>,
}

impl AggregateResult {
    /// Reduce a sample set.
    #[must_use]
    pub fn from_sample_set(set: &SampleSet) -> Self {
        let times = set.elapsed_times();
        let counts = set.last_counts();
        Self {
            config: set.config().clone(),
            statistics: Statistics::from_samples(&times),
            times,
            total_words: counts.total,
            unique_words: counts.unique,
            attempted: set.attempted(),
            metrics: None,
        }
    }

    /// Create a builder, mostly useful for replaying stored values and tests.
    #[must_use]
    pub fn builder(config: ExperimentConfig) -> AggregateResultBuilder {
        AggregateResultBuilder::new(config)
    }

    /// Attach derived metrics, consuming the unjoined result.
    #[must_use]
    pub fn with_metrics(mut self, metrics: DerivedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get the matrix cell.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Get the elapsed-time statistics.
    #[must_use]
    pub const fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Shorthand for `statistics().mean`.
    #[must_use]
    pub const fn mean_ms(&self) -> f64 {
        self.statistics.mean
    }

    /// Elapsed times of the successful samples, in collection order.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Word counters of the last successful sample.
    #[must_use]
    pub const fn counts(&self) -> WordCounts {
        WordCounts::new(self.total_words, self.unique_words)
    }

    /// Number of successful samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.times.len()
    }

    /// Number of attempts made.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.attempted
    }

    /// Derived metrics, if the baseline join has happened.
    #[must_use]
    pub const fn metrics(&self) -> Option<DerivedMetrics> {
        self.metrics
    }

    /// Speedup, `0.0` if not derived.
    #[must_use]
    pub fn speedup(&self) -> f64 {
        self.metrics.map_or(0.0, |m| m.speedup)
    }

    /// Efficiency in percent, `0.0` if not derived.
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        self.metrics.map_or(0.0, |m| m.efficiency)
    }
}

/// Builder for `AggregateResult`.
#[derive(Debug)]
pub struct AggregateResultBuilder {
    config: ExperimentConfig,
    times: Vec<f64>,
    counts: WordCounts,
    attempted: Option<usize>,
    metrics: Option<DerivedMetrics>,
}

impl AggregateResultBuilder {
    /// Create a new builder for a cell.
    #[must_use]
    pub const fn new(config: ExperimentConfig) -> Self {
        Self {
            config,
            times: Vec::new(),
            counts: WordCounts::new(0, 0),
            attempted: None,
            metrics: None,
        }
    }

    /// Set the successful elapsed times.
    #[must_use]
    pub fn times(mut self, times: Vec<f64>) -> Self {
        self.times = times;
        self
    }

    /// Set the word counters.
    #[must_use]
    pub const fn counts(mut self, counts: WordCounts) -> Self {
        self.counts = counts;
        self
    }

    /// Set the attempt count (defaults to the number of times).
    #[must_use]
    pub const fn attempted(mut self, attempted: usize) -> Self {
        self.attempted = Some(attempted);
        self
    }

    /// Set derived metrics.
    #[must_use]
    pub const fn metrics(mut self, metrics: DerivedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the `AggregateResult`.
    #[must_use]
    pub fn build(self) -> AggregateResult {
        AggregateResult {
            statistics: Statistics::from_samples(&self.times),
            attempted: self.attempted.unwrap_or(self.times.len()),
            times: self.times,
            total_words: self.counts.total,
            unique_words: self.counts.unique,
            config: self.config,
            metrics: self.metrics,
        }
    }
}
