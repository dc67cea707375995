//! Raw samples and the per-cell sample set

use serde::{Deserialize, Serialize};

use super::ExperimentConfig;

/// Counters recovered from the counter program's stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCounts {
    /// Value of the `Total Words:` line.
    pub total: u64,
    /// Value of the `Unique Words:` line.
    pub unique: u64,
}

impl WordCounts {
    /// Create a counter pair.
    #[must_use]
    pub const fn new(total: u64, unique: u64) -> Self {
        Self { total, unique }
    }
}

/// One trial attempt. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    elapsed_ms: f64,
    total_words: u64,
    unique_words: u64,
    success: bool,
}

impl RawSample {
    /// A successful attempt.
    #[must_use]
    pub const fn succeeded(elapsed_ms: f64, counts: WordCounts) -> Self {
        Self {
            elapsed_ms,
            total_words: counts.total,
            unique_words: counts.unique,
            success: true,
        }
    }

    /// A failed or timed-out attempt. Counters are the prior known values.
    #[must_use]
    pub const fn failed(elapsed_ms: f64, counts: WordCounts) -> Self {
        Self {
            elapsed_ms,
            total_words: counts.total,
            unique_words: counts.unique,
            success: false,
        }
    }

    /// Wall-clock time of the attempt in milliseconds.
    #[must_use]
    pub const fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Counters carried by this sample.
    #[must_use]
    pub const fn counts(&self) -> WordCounts {
        WordCounts::new(self.total_words, self.unique_words)
    }

    /// Whether the attempt exited cleanly within the timeout.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }
}

/// Successful samples for one matrix cell, in collection order.
///
/// Grows monotonically; failed attempts only bump the attempt counter.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    config: ExperimentConfig,
    samples: Vec<RawSample>,
    attempted: usize,
}

impl SampleSet {
    /// Create an empty set for a cell.
    #[must_use]
    pub fn new(config: ExperimentConfig) -> Self {
        Self {
            samples: Vec::with_capacity(config.runs() as usize),
            config,
            attempted: 0,
        }
    }

    /// Record one attempt. Failed samples are counted and dropped.
    pub fn record(&mut self, sample: RawSample) {
        self.attempted += 1;
        if sample.is_success() {
            self.samples.push(sample);
        }
    }

    /// The cell these samples belong to.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Successful samples.
    #[must_use]
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Elapsed times of successful samples, in collection order.
    #[must_use]
    pub fn elapsed_times(&self) -> Vec<f64> {
        self.samples.iter().map(RawSample::elapsed_ms).collect()
    }

    /// Counters of the last successful sample (zero if none).
    #[must_use]
    pub fn last_counts(&self) -> WordCounts {
        self.samples
            .last()
            .map(RawSample::counts)
            .unwrap_or_default()
    }

    /// Number of successful samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when every attempt failed (or none was made).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of attempts made.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.attempted
    }

    /// Number of failed attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted - self.samples.len()
    }
}
