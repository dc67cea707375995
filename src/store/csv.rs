//! Flattened CSV projection of an experiment record (spreadsheet-compatible)

use std::fmt::Write;

use crate::experiment::{AggregateResult, ExperimentRecord};

/// CSV column names, in order.
pub const CSV_HEADER: [&str; 14] = [
    "dataset",
    "threads",
    "sync_method",
    "mean_time",
    "median_time",
    "std_dev",
    "min_time",
    "max_time",
    "speedup",
    "efficiency",
    "total_words",
    "unique_words",
    "samples",
    "attempted",
];

/// Render one row per baseline, then one per parallel cell in canonical order.
#[must_use]
pub fn generate_csv_report(record: &ExperimentRecord) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for result in record.baseline().iter().chain(record.parallel_results()) {
        push_row(&mut out, result);
    }
    out
}

fn push_row(out: &mut String, result: &AggregateResult) {
    let config = result.config();
    let stats = result.statistics();
    let counts = result.counts();
    let _ = writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        escape(config.dataset()),
        config.threads(),
        config.sync_method(),
        stats.mean,
        stats.median,
        stats.std_dev,
        stats.min,
        stats.max,
        result.speedup(),
        result.efficiency(),
        counts.total,
        counts.unique,
        result.sample_count(),
        result.attempted(),
    );
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
