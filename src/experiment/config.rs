//! Experiment Config - identity of one matrix cell

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Synchronization strategy handed to the parallel counter.
///
/// `Sequential` is the sentinel used by baseline cells; it is never passed to
/// the parallel binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronization {
    /// Sequential baseline (no threads, no synchronization).
    Sequential,
    /// Thread-local maps merged at the end.
    Reduction,
    /// Atomic counter updates.
    Atomic,
    /// Critical section around every update.
    Critical,
}

impl Synchronization {
    /// Strategies accepted by the parallel binary, in their conventional order.
    pub const PARALLEL: [Self; 3] = [Self::Reduction, Self::Atomic, Self::Critical];

    /// Command-line and serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Reduction => "reduction",
            Self::Atomic => "atomic",
            Self::Critical => "critical",
        }
    }

    /// Whether this is the baseline sentinel.
    #[must_use]
    pub const fn is_sequential(self) -> bool {
        matches!(self, Self::Sequential)
    }
}

impl fmt::Display for Synchronization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Synchronization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "reduction" => Ok(Self::Reduction),
            "atomic" => Ok(Self::Atomic),
            "critical" => Ok(Self::Critical),
            other => Err(Error::InvalidConfig(format!(
                "unknown synchronization strategy '{other}' (expected reduction, atomic or critical)"
            ))),
        }
    }
}

/// Experiment Config uniquely identifies one matrix cell.
///
/// Baseline cells always carry `threads == 1` and
/// [`Synchronization::Sequential`]; the constructors make any other
/// combination for a baseline unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentConfig {
    dataset: String,
    threads: u32,
    sync_method: Synchronization,
    runs: u32,
}

impl ExperimentConfig {
    /// Create the sequential baseline cell for a dataset.
    #[must_use]
    pub fn baseline(dataset: impl Into<String>, runs: u32) -> Self {
        Self {
            dataset: dataset.into(),
            threads: 1,
            sync_method: Synchronization::Sequential,
            runs,
        }
    }

    /// Create a parallel cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `threads` is zero or `sync_method`
    /// is the sequential sentinel.
    pub fn parallel(
        dataset: impl Into<String>,
        threads: u32,
        sync_method: Synchronization,
        runs: u32,
    ) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidConfig("thread count must be at least 1".into()));
        }
        if sync_method.is_sequential() {
            return Err(Error::InvalidConfig(
                "parallel cells need a reduction, atomic or critical strategy".into(),
            ));
        }
        Ok(Self {
            dataset: dataset.into(),
            threads,
            sync_method,
            runs,
        })
    }

    /// Get the dataset identifier.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Get the thread count (1 for the baseline).
    #[must_use]
    pub const fn threads(&self) -> u32 {
        self.threads
    }

    /// Get the synchronization strategy.
    #[must_use]
    pub const fn sync_method(&self) -> Synchronization {
        self.sync_method
    }

    /// Get the requested run count.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Whether this is a sequential baseline cell.
    #[must_use]
    pub const fn is_baseline(&self) -> bool {
        self.sync_method.is_sequential()
    }
}

impl fmt::Display for ExperimentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | threads: {} | sync: {}",
            self.dataset, self.threads, self.sync_method
        )
    }
}
