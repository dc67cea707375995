//! Experiment Schema
//!
//! Data structures flowing from the trial runner to the result store.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──┬──< BaselineIndex ──< AggregateResult (sequential)
//!                        └──< AggregateResult (parallel, canonical order)
//!
//! AggregateResult ── reduced from ──> SampleSet ──< RawSample
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use scalebench::experiment::{
//!     AggregateResult, BaselineIndex, ExperimentConfig, ExperimentRecord, RawSample,
//!     SampleSet, WordCounts,
//! };
//!
//! let config = ExperimentConfig::baseline("data/test_10mb.txt", 2);
//! let mut samples = SampleSet::new(config);
//! samples.record(RawSample::succeeded(120.0, WordCounts::new(1_000, 200)));
//! samples.record(RawSample::succeeded(130.0, WordCounts::new(1_000, 200)));
//!
//! let mut baseline = BaselineIndex::new();
//! baseline.insert(AggregateResult::from_sample_set(&samples));
//!
//! let record = ExperimentRecord::new(baseline, Vec::new());
//! assert_eq!(record.baseline().len(), 1);
//! ```

mod aggregate;
mod config;
mod record;
mod sample;

pub use aggregate::{AggregateResult, AggregateResultBuilder, DerivedMetrics};
pub use config::{ExperimentConfig, Synchronization};
pub use record::{BaselineIndex, ExperimentRecord, ExperimentRecordBuilder, RunToken};
pub use sample::{RawSample, SampleSet, WordCounts};
