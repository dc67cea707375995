//! Experiment Matrix Orchestrator
//!
//! Drives one full benchmarking run through strictly sequential phases:
//!
//! ```text
//! Init -> BaselineCollection -> ParallelCollection -> MetricDerivation -> Persistence -> Done
//! ```
//!
//! Every parallel cell is compared against a baseline that is already
//! complete, so no parallel trial starts before the last baseline trial.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::collector::SampleCollector;
use crate::config::BenchPlan;
use crate::experiment::{
    AggregateResult, BaselineIndex, ExperimentConfig, ExperimentRecord, Synchronization,
};
use crate::metrics;
use crate::runner::TrialExecutor;
use crate::store::ResultStore;
use crate::Result;

/// Orchestration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Preflight checks and dataset discovery
    Init,
    /// Sequential baseline per dataset
    BaselineCollection,
    /// Every (dataset, threads, strategy) cell
    ParallelCollection,
    /// Speedup and efficiency against the baselines
    MetricDerivation,
    /// Writing the record and its projections
    Persistence,
    /// Run finished
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::BaselineCollection => "baseline collection",
            Self::ParallelCollection => "parallel collection",
            Self::MetricDerivation => "metric derivation",
            Self::Persistence => "persistence",
            Self::Done => "done",
        };
        f.pad(name)
    }
}

/// The cross product of datasets, thread counts and strategies.
///
/// Cells are enumerated in canonical order: every baseline in dataset
/// order, then parallel cells by dataset, ascending threads and configured
/// strategy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentMatrix {
    datasets: Vec<String>,
    thread_counts: Vec<u32>,
    sync_strategies: Vec<Synchronization>,
    runs: u32,
}

impl ExperimentMatrix {
    /// Build the full matrix of a plan.
    #[must_use]
    pub fn new(plan: &BenchPlan) -> Self {
        Self {
            datasets: plan.datasets().to_vec(),
            thread_counts: plan.thread_counts().to_vec(),
            sync_strategies: plan.sync_strategies().to_vec(),
            runs: plan.runs(),
        }
    }

    /// Keep only the datasets matching `keep`, in their original order.
    #[must_use]
    pub fn retain_datasets(mut self, mut keep: impl FnMut(&str) -> bool) -> Self {
        self.datasets.retain(|d| keep(d.as_str()));
        self
    }

    /// Datasets in the matrix.
    #[must_use]
    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    /// Number of cells: `|D| x (1 + |T| x |S|)`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len() * (1 + self.thread_counts.len() * self.sync_strategies.len())
    }

    /// Whether the matrix has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// One sequential baseline per dataset.
    pub fn baseline_cells(&self) -> impl Iterator<Item = ExperimentConfig> + '_ {
        self.datasets
            .iter()
            .map(|dataset| ExperimentConfig::baseline(dataset.as_str(), self.runs))
    }

    /// Every parallel cell in canonical order.
    pub fn parallel_cells(&self) -> impl Iterator<Item = ExperimentConfig> + '_ {
        self.datasets.iter().flat_map(move |dataset| {
            self.thread_counts.iter().flat_map(move |&threads| {
                // Plan validation rules out zero threads and the sentinel.
                self.sync_strategies.iter().filter_map(move |&sync| {
                    ExperimentConfig::parallel(dataset.as_str(), threads, sync, self.runs).ok()
                })
            })
        })
    }

    /// Every cell: baselines first, then parallel cells.
    pub fn cells(&self) -> impl Iterator<Item = ExperimentConfig> + '_ {
        self.baseline_cells().chain(self.parallel_cells())
    }
}

/// Runs the experiment matrix end to end.
#[derive(Debug)]
pub struct Orchestrator<E> {
    plan: BenchPlan,
    collector: SampleCollector<E>,
    store: ResultStore,
    phase: Phase,
}

impl<E: TrialExecutor> Orchestrator<E> {
    /// Create an orchestrator. Nothing runs until [`Orchestrator::run`].
    #[must_use]
    pub const fn new(plan: BenchPlan, executor: E, store: ResultStore) -> Self {
        Self {
            plan,
            collector: SampleCollector::new(executor),
            store,
            phase: Phase::Init,
        }
    }

    /// Current phase; after a failed run, the phase that failed.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the plan.
    #[must_use]
    pub const fn plan(&self) -> &BenchPlan {
        &self.plan
    }

    /// Get the result store.
    #[must_use]
    pub const fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run every phase and return the persisted record.
    ///
    /// Failed trials, empty cells and missing baselines are recorded, not
    /// raised.
    ///
    /// # Errors
    ///
    /// Returns the preflight error of the executor, [`crate::Error::ResultsDirUnwritable`]
    /// if the result store cannot accept records, or the error of the result
    /// store if the record cannot be persisted.
    pub fn run(&mut self) -> Result<ExperimentRecord> {
        self.enter(Phase::Init);
        self.collector.executor().preflight()?;
        self.store.prepare()?;
        let matrix = self.discover_inputs();
        info!(
            datasets = matrix.datasets().len(),
            cells = matrix.len(),
            runs = self.plan.runs(),
            "experiment matrix ready"
        );

        self.enter(Phase::BaselineCollection);
        let mut baselines = BaselineIndex::new();
        for config in matrix.baseline_cells() {
            let set = self.collector.collect(&config);
            baselines.insert(metrics::derive_baseline(AggregateResult::from_sample_set(&set)));
        }

        self.enter(Phase::ParallelCollection);
        let parallel: Vec<AggregateResult> = matrix
            .parallel_cells()
            .map(|config| AggregateResult::from_sample_set(&self.collector.collect(&config)))
            .collect();

        self.enter(Phase::MetricDerivation);
        let parallel = metrics::derive_all(&baselines, parallel);

        self.enter(Phase::Persistence);
        let record = ExperimentRecord::new(baselines, parallel);
        self.store.save(&record)?;

        self.enter(Phase::Done);
        match record.best_speedup() {
            Some(best) => info!(
                cell = %best.config(),
                "Best speedup: {:.2}x ({:.1}% efficiency)",
                best.speedup(),
                best.efficiency()
            ),
            None => warn!("no comparable parallel results"),
        }
        Ok(record)
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        info!(%phase, "entering phase");
    }

    fn discover_inputs(&self) -> ExperimentMatrix {
        ExperimentMatrix::new(&self.plan).retain_datasets(|dataset| {
            let found = Path::new(dataset).is_file();
            if !found {
                warn!(dataset, "input not found, skipping dataset");
            }
            found
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;

    fn plan(datasets: Vec<String>, threads: Vec<u32>, syncs: Vec<Synchronization>) -> BenchPlan {
        let mut config = BenchConfig::default();
        config.matrix.datasets = datasets;
        config.matrix.thread_counts = threads;
        config.matrix.sync_strategies = syncs;
        config.runner.runs = 2;
        config.plan().unwrap()
    }

    #[test]
    fn test_matrix_size_and_order() {
        let plan = plan(
            vec!["a".into(), "b".into()],
            vec![4, 1],
            vec![Synchronization::Critical, Synchronization::Reduction],
        );
        let matrix = ExperimentMatrix::new(&plan);
        assert_eq!(matrix.len(), 2 * (1 + 2 * 2));

        let cells: Vec<(String, u32, Synchronization)> = matrix
            .cells()
            .map(|c| (c.dataset().to_string(), c.threads(), c.sync_method()))
            .collect();
        assert_eq!(cells.len(), matrix.len());
        assert_eq!(cells[0], ("a".into(), 1, Synchronization::Sequential));
        assert_eq!(cells[1], ("b".into(), 1, Synchronization::Sequential));
        assert_eq!(cells[2], ("a".into(), 1, Synchronization::Critical));
        assert_eq!(cells[3], ("a".into(), 1, Synchronization::Reduction));
        assert_eq!(cells[4], ("a".into(), 4, Synchronization::Critical));
        assert_eq!(cells[9], ("b".into(), 4, Synchronization::Reduction));
    }

    #[test]
    fn test_retain_datasets_keeps_order() {
        let plan = plan(
            vec!["a".into(), "b".into(), "c".into()],
            vec![2],
            vec![Synchronization::Atomic],
        );
        let matrix = ExperimentMatrix::new(&plan).retain_datasets(|d| d != "b");
        assert_eq!(matrix.datasets(), &["a".to_string(), "c".to_string()]);
        assert_eq!(matrix.len(), 4);
        assert!(!matrix.is_empty());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::BaselineCollection.to_string(), "baseline collection");
        assert_eq!(format!("{:<6}|", Phase::Done), "done  |");
    }
}
