//! Sample Collector
//!
//! Repeats the trial runner for one matrix cell, one attempt at a time.
//! Overlapping trials would contend for CPU and I/O and corrupt each
//! other's timings.

use tracing::{info, warn};

use crate::experiment::{ExperimentConfig, RawSample, SampleSet, WordCounts};
use crate::runner::TrialExecutor;

/// Drives `runs` sequential trials per cell.
#[derive(Debug)]
pub struct SampleCollector<E> {
    executor: E,
}

impl<E: TrialExecutor> SampleCollector<E> {
    /// Create a collector over an executor.
    #[must_use]
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Get the underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `config.runs()` trials and keep the successful ones.
    ///
    /// Counters are sticky across attempts: each trial starts from the last
    /// known values. An all-failed cell returns an empty set, never an error.
    #[must_use]
    pub fn collect(&self, config: &ExperimentConfig) -> SampleSet {
        let runs = config.runs();
        let mut set = SampleSet::new(config.clone());
        let mut counts = WordCounts::default();

        for run in 1..=runs {
            match self.executor.execute(config, counts) {
                Ok(sample) => {
                    counts = sample.counts();
                    info!(cell = %config, "Run {run}/{runs}: {:.2} ms", sample.elapsed_ms());
                    set.record(sample);
                }
                Err(failure) => {
                    warn!(cell = %config, "Run {run}/{runs} failed: {failure}");
                    set.record(RawSample::failed(failure.elapsed_ms(), counts));
                }
            }
        }

        if set.is_empty() {
            warn!(cell = %config, attempted = set.attempted(), "no successful runs");
        } else {
            info!(
                cell = %config,
                successful = set.len(),
                attempted = set.attempted(),
                "collection finished"
            );
        }
        set
    }
}
