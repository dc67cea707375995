//! Orchestrator integration tests against a modeled executor
//!
//! The executor replaces process launches with a timing model, so whole
//! orchestration runs finish instantly and deterministically.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scalebench::config::{BenchConfig, BenchPlan};
use scalebench::experiment::{
    DerivedMetrics, ExperimentConfig, RawSample, Synchronization, WordCounts,
};
use scalebench::orchestrator::{Orchestrator, Phase};
use scalebench::runner::{TrialExecutor, TrialFailure};
use scalebench::store::ResultStore;
use scalebench::Error;
use tempfile::TempDir;

/// Baseline takes 1000 ms; `t` threads take `1200 / t` ms.
#[derive(Default)]
struct ModeledCounter {
    calls: RefCell<Vec<ExperimentConfig>>,
    failing_threads: Option<u32>,
    failing_baselines: bool,
    missing_binary: bool,
}

impl TrialExecutor for ModeledCounter {
    fn preflight(&self) -> scalebench::Result<()> {
        if self.missing_binary {
            return Err(Error::MissingExecutable {
                path: PathBuf::from("build/parallel_counter"),
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        config: &ExperimentConfig,
        _prior: WordCounts,
    ) -> Result<RawSample, TrialFailure> {
        self.calls.borrow_mut().push(config.clone());

        let fails = if config.is_baseline() {
            self.failing_baselines
        } else {
            self.failing_threads == Some(config.threads())
        };
        if fails {
            return Err(TrialFailure::TimedOut {
                timeout: Duration::from_secs(300),
            });
        }

        let ms = if config.is_baseline() {
            1000.0
        } else {
            1200.0 / f64::from(config.threads())
        };
        Ok(RawSample::succeeded(ms, WordCounts::new(1_000, 100)))
    }
}

struct Fixture {
    dir: TempDir,
    datasets: Vec<String>,
}

impl Fixture {
    /// Creates `present` dataset files and names `missing` nonexistent ones.
    fn new(present: &[&str], missing: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let mut datasets = Vec::new();
        for name in present {
            let path = dir.path().join(name);
            std::fs::write(&path, "the quick brown fox\n").unwrap();
            datasets.push(path.to_string_lossy().into_owned());
        }
        for name in missing {
            datasets.push(dir.path().join(name).to_string_lossy().into_owned());
        }
        Self { dir, datasets }
    }

    fn plan(&self, threads: Vec<u32>, syncs: Vec<Synchronization>, runs: u32) -> BenchPlan {
        let mut config = BenchConfig::default();
        config.matrix.datasets = self.datasets.clone();
        config.matrix.thread_counts = threads;
        config.matrix.sync_strategies = syncs;
        config.runner.runs = runs;
        config.output.directory = self.results_dir();
        config.plan().unwrap()
    }

    fn results_dir(&self) -> PathBuf {
        self.dir.path().join("results")
    }

    fn dataset(&self, i: usize) -> &str {
        &self.datasets[i]
    }
}

#[test]
fn test_full_run_derives_metrics_and_persists() {
    let fixture = Fixture::new(&["a.txt"], &[]);
    let plan = fixture.plan(
        vec![4, 1],
        vec![Synchronization::Reduction, Synchronization::Atomic],
        3,
    );
    let executor = ModeledCounter::default();
    let store = ResultStore::new(plan.results_dir());

    let mut orchestrator = Orchestrator::new(plan, &executor, store);
    assert_eq!(orchestrator.phase(), Phase::Init);
    let record = orchestrator.run().unwrap();
    assert_eq!(orchestrator.phase(), Phase::Done);

    // 1 dataset x (1 + 2 threads x 2 strategies) x 3 runs
    assert_eq!(executor.calls.borrow().len(), 15);

    let baseline = record.baseline().get(fixture.dataset(0)).unwrap();
    assert_eq!(baseline.metrics(), Some(DerivedMetrics::IDENTITY));
    assert_eq!(baseline.sample_count(), 3);

    let cells: Vec<(u32, Synchronization)> = record
        .parallel_results()
        .iter()
        .map(|r| (r.config().threads(), r.config().sync_method()))
        .collect();
    assert_eq!(
        cells,
        vec![
            (1, Synchronization::Reduction),
            (1, Synchronization::Atomic),
            (4, Synchronization::Reduction),
            (4, Synchronization::Atomic),
        ]
    );

    let four = &record.parallel_results()[2];
    assert!((four.speedup() - 1000.0 / 300.0).abs() < 1e-9);
    assert!((four.efficiency() - 1000.0 / 300.0 / 4.0 * 100.0).abs() < 1e-9);
    assert_eq!(format!("{:.2}", four.speedup()), "3.33");
    assert_eq!(format!("{:.1}", four.efficiency()), "83.3");

    let single = &record.parallel_results()[0];
    assert!((single.speedup() - 1000.0 / 1200.0).abs() < 1e-9);

    let stored = ResultStore::new(fixture.results_dir()).load_latest().unwrap();
    assert_eq!(stored, record);
}

#[test]
fn test_all_baselines_run_before_any_parallel_cell() {
    let fixture = Fixture::new(&["a.txt", "b.txt"], &[]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Critical], 2);
    let executor = ModeledCounter::default();

    Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()))
        .run()
        .unwrap();

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 2 * (1 + 1) * 2);
    assert!(calls[..4].iter().all(ExperimentConfig::is_baseline));
    assert!(calls[4..].iter().all(|c| !c.is_baseline()));
    assert_eq!(calls[0].dataset(), fixture.dataset(0));
    assert_eq!(calls[2].dataset(), fixture.dataset(1));
}

#[test]
fn test_missing_dataset_is_skipped() {
    let fixture = Fixture::new(&["present.txt"], &["absent.txt"]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Atomic], 1);
    let executor = ModeledCounter::default();

    let record = Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()))
        .run()
        .unwrap();

    assert_eq!(record.baseline().len(), 1);
    assert!(record.baseline().get(fixture.dataset(1)).is_none());
    assert!(executor
        .calls
        .borrow()
        .iter()
        .all(|c| c.dataset() == fixture.dataset(0)));
}

#[test]
fn test_no_inputs_persists_empty_record() {
    let fixture = Fixture::new(&[], &["absent.txt"]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Atomic], 1);
    let executor = ModeledCounter::default();

    let record = Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()))
        .run()
        .unwrap();

    assert!(record.baseline().is_empty());
    assert!(record.parallel_results().is_empty());
    assert!(executor.calls.borrow().is_empty());
    assert_eq!(
        ResultStore::new(fixture.results_dir()).list_tokens().unwrap(),
        vec![record.timestamp()]
    );
}

#[test]
fn test_failed_cell_kept_with_sentinel_metrics() {
    let fixture = Fixture::new(&["a.txt"], &[]);
    let plan = fixture.plan(vec![2, 8], vec![Synchronization::Reduction], 3);
    let executor = ModeledCounter {
        failing_threads: Some(8),
        ..ModeledCounter::default()
    };

    let record = Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()))
        .run()
        .unwrap();

    let failed = &record.parallel_results()[1];
    assert_eq!(failed.config().threads(), 8);
    assert_eq!(failed.sample_count(), 0);
    assert_eq!(failed.attempted(), 3);
    assert_eq!(failed.mean_ms(), 0.0);
    assert_eq!(failed.metrics(), Some(DerivedMetrics::INCOMPARABLE));

    let best = record.best_speedup().unwrap();
    assert_eq!(best.config().threads(), 2);
}

#[test]
fn test_failed_baseline_makes_dataset_incomparable() {
    let fixture = Fixture::new(&["a.txt"], &[]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Atomic], 2);
    let executor = ModeledCounter {
        failing_baselines: true,
        ..ModeledCounter::default()
    };

    let record = Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()))
        .run()
        .unwrap();

    let baseline = record.baseline().get(fixture.dataset(0)).unwrap();
    assert_eq!(baseline.sample_count(), 0);
    assert_eq!(baseline.metrics(), Some(DerivedMetrics::IDENTITY));

    let cell = &record.parallel_results()[0];
    assert_eq!(cell.sample_count(), 2);
    assert_eq!(cell.metrics(), Some(DerivedMetrics::INCOMPARABLE));
    assert!(record.best_speedup().is_none());
}

#[test]
fn test_preflight_failure_aborts_before_any_trial() {
    let fixture = Fixture::new(&["a.txt"], &[]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Atomic], 1);
    let executor = ModeledCounter {
        missing_binary: true,
        ..ModeledCounter::default()
    };

    let mut orchestrator =
        Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()));
    let error = orchestrator.run().unwrap_err();

    assert!(matches!(error, Error::MissingExecutable { .. }));
    assert_eq!(orchestrator.phase(), Phase::Init);
    assert!(executor.calls.borrow().is_empty());
    assert!(!Path::new(&fixture.results_dir()).exists());
}

#[test]
fn test_unusable_results_dir_aborts_before_any_trial() {
    let fixture = Fixture::new(&["a.txt"], &[]);
    let plan = fixture.plan(vec![2], vec![Synchronization::Atomic], 1);
    let executor = ModeledCounter::default();
    // A regular file sits where the results directory should be.
    std::fs::write(fixture.results_dir(), "occupied").unwrap();

    let mut orchestrator =
        Orchestrator::new(plan, &executor, ResultStore::new(fixture.results_dir()));
    let error = orchestrator.run().unwrap_err();

    assert!(matches!(error, Error::ResultsDirUnwritable { .. }));
    assert_eq!(orchestrator.phase(), Phase::Init);
    assert!(executor.calls.borrow().is_empty());
    assert!(fixture.results_dir().is_file());
}
