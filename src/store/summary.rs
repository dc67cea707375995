//! Human-readable summary projection

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::experiment::{AggregateResult, ExperimentRecord};

const RULE_WIDTH: usize = 80;

/// Render per-dataset tables: baseline first, then parallel rows sorted by
/// thread count and strategy name. Averages per thread count and per
/// strategy across all datasets follow, then the best speedup.
#[must_use]
pub fn generate_summary(record: &ExperimentRecord) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "PARALLEL BENCHMARKING SUMMARY");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "Timestamp: {}", record.timestamp());

    for dataset in record.datasets() {
        let _ = writeln!(out, "\nDataset: {dataset}");
        let _ = writeln!(out, "{light}");
        let _ = writeln!(
            out,
            "{:<10} {:<12} {:<12} {:<10} {:<12} {:<8}",
            "Threads", "Sync", "Time(ms)", "Speedup", "Efficiency", "Runs"
        );
        let _ = writeln!(out, "{light}");

        if let Some(baseline) = record.baseline().get(dataset) {
            push_row(&mut out, baseline);
        }

        let mut rows: Vec<&AggregateResult> = record
            .parallel_results()
            .iter()
            .filter(|r| r.config().dataset() == dataset)
            .collect();
        rows.sort_by(|a, b| {
            (a.config().threads(), a.config().sync_method().as_str())
                .cmp(&(b.config().threads(), b.config().sync_method().as_str()))
        });
        for row in rows {
            push_row(&mut out, row);
        }
    }

    push_averages(&mut out, record);

    let _ = writeln!(out);
    match record.best_speedup() {
        Some(best) => {
            let _ = writeln!(
                out,
                "Best speedup: {} with {} threads ({}): {:.2}x speedup, {:.1}% efficiency",
                best.config().dataset(),
                best.config().threads(),
                best.config().sync_method(),
                best.speedup(),
                best.efficiency()
            );
        }
        None => {
            let _ = writeln!(out, "Best speedup: n/a (no comparable parallel results)");
        }
    }
    out
}

/// Running sum of speedup and efficiency.
#[derive(Default)]
struct Mean {
    speedup: f64,
    efficiency: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, result: &AggregateResult) {
        self.speedup += result.speedup();
        self.efficiency += result.efficiency();
        self.count += 1;
    }

    fn line(&self, label: &str) -> String {
        let n = f64::from(self.count);
        format!(
            "  {label}: {:.2}x speedup, {:.1}% efficiency",
            self.speedup / n,
            self.efficiency / n
        )
    }
}

/// Incomparable cells carry sentinels, not measurements, and are left out.
fn push_averages(out: &mut String, record: &ExperimentRecord) {
    let mut by_threads: BTreeMap<u32, Mean> = BTreeMap::new();
    let mut by_sync: BTreeMap<&'static str, Mean> = BTreeMap::new();
    for result in record
        .parallel_results()
        .iter()
        .filter(|r| r.metrics().is_some_and(|m| !m.is_incomparable()))
    {
        by_threads.entry(result.config().threads()).or_default().add(result);
        by_sync
            .entry(result.config().sync_method().as_str())
            .or_default()
            .add(result);
    }
    if by_threads.is_empty() {
        return;
    }

    let _ = writeln!(out, "\nAverage by thread count:");
    for (threads, mean) in &by_threads {
        let _ = writeln!(out, "{}", mean.line(&format!("{threads} threads")));
    }
    let _ = writeln!(out, "\nAverage by synchronization:");
    for (name, mean) in &by_sync {
        let _ = writeln!(out, "{}", mean.line(&capitalize(name)));
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn push_row(out: &mut String, result: &AggregateResult) {
    let config = result.config();
    let speedup = format!("{:.2}x", result.speedup());
    let efficiency = format!("{:.2}%", result.efficiency());
    let runs = format!("{}/{}", result.sample_count(), result.attempted());
    let _ = writeln!(
        out,
        "{:<10} {:<12} {:<12.2} {:<10} {:<12} {:<8}",
        config.threads(),
        config.sync_method(),
        result.mean_ms(),
        speedup,
        efficiency,
        runs
    );
}
