//! Result store integration tests
//!
//! Records are written into isolated temporary directories.

use std::fs;

use scalebench::experiment::{
    AggregateResult, BaselineIndex, DerivedMetrics, ExperimentConfig, ExperimentRecord,
    Synchronization, WordCounts,
};
use scalebench::store::{ResultStore, CSV_HEADER};
use scalebench::Error;
use tempfile::TempDir;

fn record_at(token: &str) -> ExperimentRecord {
    let baseline = AggregateResult::builder(ExperimentConfig::baseline("data/test_10mb.txt", 3))
        .times(vec![1000.0, 1010.5, 989.5])
        .counts(WordCounts::new(1_750_000, 48_213))
        .metrics(DerivedMetrics::IDENTITY)
        .build();

    let parallel = [2, 4]
        .into_iter()
        .flat_map(|threads| {
            [Synchronization::Reduction, Synchronization::Critical]
                .into_iter()
                .map(move |sync| {
                    let mean = 1000.0 / f64::from(threads) * 1.1;
                    let speedup = 1000.0 / mean;
                    AggregateResult::builder(
                        ExperimentConfig::parallel("data/test_10mb.txt", threads, sync, 3)
                            .unwrap(),
                    )
                    .times(vec![mean])
                    .counts(WordCounts::new(1_750_000, 48_213))
                    .attempted(3)
                    .metrics(DerivedMetrics {
                        speedup,
                        efficiency: speedup / f64::from(threads) * 100.0,
                    })
                    .build()
                })
        })
        .collect();

    ExperimentRecord::builder()
        .timestamp(token.parse().unwrap())
        .baseline(std::iter::once(baseline).collect::<BaselineIndex>())
        .parallel_results(parallel)
        .build()
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());
    let record = record_at("20260301_120000_000000");

    store.save(&record).unwrap();
    let loaded = store.load(record.timestamp()).unwrap();

    assert_eq!(loaded, record);
    assert_eq!(loaded.parallel_results().len(), 4);
    assert_eq!(
        loaded.parallel_results()[0].statistics(),
        record.parallel_results()[0].statistics()
    );
}

#[test]
fn test_latest_selected_by_token_not_mtime() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());

    // The newer token is written first, so the older record has the later mtime.
    let newer = record_at("20260302_080000_000000");
    let older = record_at("20260301_235959_999999");
    store.save(&newer).unwrap();
    store.save(&older).unwrap();

    assert_eq!(store.load_latest().unwrap().timestamp(), newer.timestamp());
    assert_eq!(
        store.list_tokens().unwrap(),
        vec![older.timestamp(), newer.timestamp()]
    );
}

#[test]
fn test_missing_directory_is_record_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path().join("never-created"));

    match store.load_latest() {
        Err(Error::RecordNotFound { dir: scanned }) => assert_eq!(scanned, store.dir()),
        other => panic!("expected RecordNotFound, got {other:?}"),
    }
}

#[test]
fn test_load_unknown_token_is_record_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());
    store.save(&record_at("20260301_120000_000000")).unwrap();

    let unknown = "20250101_000000_000000".parse().unwrap();
    assert!(matches!(store.load(unknown), Err(Error::RecordNotFound { .. })));
}

#[test]
fn test_corrupt_latest_record_is_json_error() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());
    store.save(&record_at("20260301_120000_000000")).unwrap();
    fs::write(
        dir.path().join("parallel_benchmark_20260401_000000_000000.json"),
        "{ truncated",
    )
    .unwrap();

    assert!(matches!(store.load_latest(), Err(Error::Json(_))));
}

#[test]
fn test_csv_projection() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());
    let saved = store.save(&record_at("20260301_120000_000000")).unwrap();

    let csv = fs::read_to_string(saved.csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER.join(","));
    // one baseline + four parallel cells
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("data/test_10mb.txt,1,sequential,1000,"));
    assert!(lines[2].starts_with("data/test_10mb.txt,2,reduction,"));
    assert!(lines.iter().skip(1).all(|l| l.split(',').count() == CSV_HEADER.len()));
}

#[test]
fn test_summary_projection() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path());
    let saved = store.save(&record_at("20260301_120000_000000")).unwrap();

    let summary = fs::read_to_string(saved.summary).unwrap();
    assert!(summary.contains("PARALLEL BENCHMARKING SUMMARY"));
    assert!(summary.contains("Timestamp: 20260301_120000_000000"));
    assert!(summary.contains("Dataset: data/test_10mb.txt"));
    assert!(summary.contains("Best speedup: data/test_10mb.txt with 4 threads"));

    let critical_2 = summary.find("2          critical").unwrap();
    let reduction_2 = summary.find("2          reduction").unwrap();
    let critical_4 = summary.find("4          critical").unwrap();
    assert!(critical_2 < reduction_2 && reduction_2 < critical_4);
}
