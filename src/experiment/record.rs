//! Experiment Record - root entity persisted once per orchestration run

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::AggregateResult;
use crate::{Error, Result};

const TOKEN_FORMAT: &str = "%Y%m%d_%H%M%S";
const MICROS_PER_SECOND: i64 = 1_000_000;

static LAST_TOKEN_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Sortable identity of one orchestration run.
///
/// Rendered as `YYYYMMDD_HHMMSS_ffffff` (UTC, microseconds). The width is
/// fixed, so lexical order of the rendered token equals chronological order.
/// Tokens minted by [`RunToken::now`] within one process are strictly
/// increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunToken(DateTime<Utc>);

impl RunToken {
    /// Mint a token for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now().timestamp_micros();
        let mut prev = LAST_TOKEN_MICROS.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev.saturating_add(1));
            match LAST_TOKEN_MICROS.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self::from_micros(next).unwrap_or_else(|| Self(Utc::now())),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Create a token from a timestamp, truncated to microseconds.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_micros(at.timestamp_micros()).unwrap_or(Self(at))
    }

    fn from_micros(micros: i64) -> Option<Self> {
        let secs = micros.div_euclid(MICROS_PER_SECOND);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos).map(Self)
    }

    /// The instant this token stands for.
    #[must_use]
    pub const fn datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{:06}",
            self.0.format(TOKEN_FORMAT),
            self.0.timestamp_subsec_micros()
        )
    }
}

impl FromStr for RunToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidToken(s.to_string());

        let (seconds, micros) = s.rsplit_once('_').ok_or_else(invalid)?;
        if micros.len() != 6 || !micros.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let at = NaiveDateTime::parse_from_str(seconds, TOKEN_FORMAT)
            .map_err(|_| invalid())?
            .and_utc();

        Self::from_micros(at.timestamp() * MICROS_PER_SECOND + micros).ok_or_else(invalid)
    }
}

impl Serialize for RunToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RunToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sequential baselines keyed by dataset, in insertion order.
///
/// Built once during baseline collection and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineIndex {
    entries: Vec<AggregateResult>,
}

impl BaselineIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a baseline. A second baseline for the same dataset replaces the
    /// first in place, keeping its position.
    pub fn insert(&mut self, result: AggregateResult) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.config().dataset() == result.config().dataset())
        {
            Some(slot) => *slot = result,
            None => self.entries.push(result),
        }
    }

    /// Look up the baseline of a dataset.
    #[must_use]
    pub fn get(&self, dataset: &str) -> Option<&AggregateResult> {
        self.entries.iter().find(|e| e.config().dataset() == dataset)
    }

    /// Iterate baselines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AggregateResult> {
        self.entries.iter()
    }

    /// Number of baselines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no baseline was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<AggregateResult> for BaselineIndex {
    fn from_iter<I: IntoIterator<Item = AggregateResult>>(iter: I) -> Self {
        let mut index = Self::new();
        for result in iter {
            index.insert(result);
        }
        index
    }
}

/// Experiment Record is the unit of persistence.
///
/// One per orchestration run: the timestamp token, every baseline, and every
/// parallel cell in canonical enumeration order. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    timestamp: RunToken,
    sequential_baseline: BaselineIndex,
    parallel_results: Vec<AggregateResult>,
}

impl ExperimentRecord {
    /// Create a record stamped with a fresh token.
    #[must_use]
    pub fn new(baseline: BaselineIndex, parallel_results: Vec<AggregateResult>) -> Self {
        Self::builder()
            .baseline(baseline)
            .parallel_results(parallel_results)
            .build()
    }

    /// Create a builder for constructing a record with optional fields.
    #[must_use]
    pub fn builder() -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new()
    }

    /// Get the run token.
    #[must_use]
    pub const fn timestamp(&self) -> RunToken {
        self.timestamp
    }

    /// Get the sequential baselines.
    #[must_use]
    pub const fn baseline(&self) -> &BaselineIndex {
        &self.sequential_baseline
    }

    /// Get the parallel results in canonical order.
    #[must_use]
    pub fn parallel_results(&self) -> &[AggregateResult] {
        &self.parallel_results
    }

    /// Dataset identifiers in first-seen order across baseline and parallel cells.
    #[must_use]
    pub fn datasets(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let all = self
            .sequential_baseline
            .iter()
            .chain(self.parallel_results.iter());
        for result in all {
            let dataset = result.config().dataset();
            if !seen.contains(&dataset) {
                seen.push(dataset);
            }
        }
        seen
    }

    /// Parallel cell with the highest speedup, if any cell was comparable.
    #[must_use]
    pub fn best_speedup(&self) -> Option<&AggregateResult> {
        self.parallel_results
            .iter()
            .filter(|r| r.speedup() > 0.0)
            .max_by(|a, b| a.speedup().total_cmp(&b.speedup()))
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    timestamp: Option<RunToken>,
    sequential_baseline: BaselineIndex,
    parallel_results: Vec<AggregateResult>,
}

impl ExperimentRecordBuilder {
    /// Create a new empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timestamp: None,
            sequential_baseline: BaselineIndex {
                entries: Vec::new(),
            },
            parallel_results: Vec::new(),
        }
    }

    /// Set a custom token (useful for deserialization/testing).
    #[must_use]
    pub const fn timestamp(mut self, timestamp: RunToken) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the baseline index.
    #[must_use]
    pub fn baseline(mut self, baseline: BaselineIndex) -> Self {
        self.sequential_baseline = baseline;
        self
    }

    /// Set the parallel results.
    #[must_use]
    pub fn parallel_results(mut self, results: Vec<AggregateResult>) -> Self {
        self.parallel_results = results;
        self
    }

    /// Build the `ExperimentRecord`, minting a token if none was set.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            timestamp: self.timestamp.unwrap_or_else(RunToken::now),
            sequential_baseline: self.sequential_baseline,
            parallel_results: self.parallel_results,
        }
    }
}

impl Default for ExperimentRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
