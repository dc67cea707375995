//! # scalebench: Parallel Scaling Benchmark Harness
//!
//! **Version**: 0.1.0
//!
//! scalebench measures how an external word-counting program scales with
//! thread count and synchronization strategy. It runs a sequential baseline
//! and every (dataset, threads, strategy) cell of a parallel counter, reduces
//! repeated trials to summary statistics, derives speedup and efficiency
//! against the baseline, and persists a timestamped record with CSV and
//! human-readable projections.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Genchi Genbutsu**: Wall-clock timing around the real process
//! - **Jidoka**: A failed trial is discarded and logged, never fatal
//! - **Poka-Yoke**: Baseline cells cannot carry threads or a strategy
//! - **Muda elimination**: Projections are derived from one authoritative record
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use scalebench::config::BenchConfig;
//! use scalebench::orchestrator::Orchestrator;
//! use scalebench::runner::ProcessTrialRunner;
//! use scalebench::store::ResultStore;
//!
//! let plan = BenchConfig::default().plan()?;
//! let runner = ProcessTrialRunner::from_plan(&plan);
//! let store = ResultStore::new(plan.results_dir());
//!
//! let record = Orchestrator::new(plan, runner, store).run()?;
//! if let Some(best) = record.best_speedup() {
//!     println!("{}: {:.2}x", best.config(), best.speedup());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod collector;
pub mod config;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod orchestrator;
pub mod runner;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
