//! Metric Deriver
//!
//! Joins each aggregate to its dataset's sequential baseline.
//!
//! - baseline vs itself: speedup `1.0`, efficiency `100.0`, by definition
//! - `speedup = baseline.mean / result.mean`
//! - `efficiency = speedup / threads * 100`, never clamped, so super-linear
//!   results and noise stay visible
//! - no usable baseline, or an empty sample set on either side: speedup and
//!   efficiency are both `0.0` (incomparable) and the result is kept

use tracing::warn;

use crate::experiment::{AggregateResult, BaselineIndex, DerivedMetrics};

/// Metrics of a parallel cell against a baseline mean.
///
/// Returns [`DerivedMetrics::INCOMPARABLE`] when either mean is not a
/// positive number.
///
/// ```rust
/// use scalebench::metrics::compare;
///
/// let m = compare(1000.0, 300.0, 4);
/// assert!((m.speedup - 3.333_333).abs() < 1e-6);
/// assert!((m.efficiency - 83.333_333).abs() < 1e-6);
/// ```
#[must_use]
pub fn compare(baseline_mean: f64, result_mean: f64, threads: u32) -> DerivedMetrics {
    if !(baseline_mean > 0.0 && result_mean > 0.0) || threads == 0 {
        return DerivedMetrics::INCOMPARABLE;
    }
    let speedup = baseline_mean / result_mean;
    DerivedMetrics {
        speedup,
        efficiency: (speedup / f64::from(threads)) * 100.0,
    }
}

/// Stamp a baseline with the identity metrics.
#[must_use]
pub fn derive_baseline(baseline: AggregateResult) -> AggregateResult {
    baseline.with_metrics(DerivedMetrics::IDENTITY)
}

/// Derive metrics for one aggregate.
///
/// Baseline cells get the identity metrics regardless of their measured mean.
#[must_use]
pub fn derive(baselines: &BaselineIndex, result: AggregateResult) -> AggregateResult {
    if result.config().is_baseline() {
        return derive_baseline(result);
    }

    let dataset = result.config().dataset();
    let metrics = match baselines.get(dataset) {
        Some(baseline) if baseline.sample_count() > 0 => {
            compare(baseline.mean_ms(), result.mean_ms(), result.config().threads())
        }
        Some(_) => {
            warn!(dataset, "baseline has no successful samples, metrics incomparable");
            DerivedMetrics::INCOMPARABLE
        }
        None => {
            warn!(dataset, "no baseline for dataset, metrics incomparable");
            DerivedMetrics::INCOMPARABLE
        }
    };
    result.with_metrics(metrics)
}

/// Derive metrics for every parallel result, preserving order.
#[must_use]
pub fn derive_all(baselines: &BaselineIndex, results: Vec<AggregateResult>) -> Vec<AggregateResult> {
    results
        .into_iter()
        .map(|result| derive(baselines, result))
        .collect()
}
