//! Statistics Engine
//!
//! Reduces elapsed times (milliseconds) to summary statistics.
//!
//! Toyota Way: Jidoka (defined results for degenerate input, never NaN)
//!
//! - Empty input: every statistic is `0.0`
//! - Fewer than two samples: `std_dev` is `0.0`
//! - `std_dev` is the sample standard deviation (n - 1 denominator)
//!
//! Values are sorted with [`f64::total_cmp`] before any reduction, so the
//! output is bit-identical for every ordering of the same multiset.

use serde::{Deserialize, Serialize};

/// Summary statistics of elapsed times, in milliseconds.
///
/// Serialized with `_time` suffixes (`mean_time`, `median_time`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Arithmetic mean
    #[serde(rename = "mean_time")]
    pub mean: f64,
    /// Median (mean of the two middle values for even counts)
    #[serde(rename = "median_time")]
    pub median: f64,
    /// Smallest value
    #[serde(rename = "min_time")]
    pub min: f64,
    /// Largest value
    #[serde(rename = "max_time")]
    pub max: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

impl Statistics {
    /// Compute statistics for a slice of elapsed times.
    ///
    /// # Example
    ///
    /// ```rust
    /// use scalebench::stats::Statistics;
    ///
    /// let stats = Statistics::from_samples(&[12.0, 10.0, 11.0]);
    /// assert!((stats.mean - 11.0).abs() < 1e-12);
    /// assert!((stats.median - 11.0).abs() < 1e-12);
    /// assert!((stats.std_dev - 1.0).abs() < 1e-12);
    ///
    /// assert_eq!(Statistics::from_samples(&[]), Statistics::default());
    /// ```
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        #[allow(clippy::cast_precision_loss)]
        let count = n as f64;

        let mean = sorted.iter().sum::<f64>() / count;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        let std_dev = if n < 2 {
            0.0
        } else {
            let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1.0);
            variance.sqrt()
        };

        Self {
            mean,
            median,
            min: sorted[0],
            max: sorted[n - 1],
            std_dev,
        }
    }

    /// Coefficient of variation (relative stddev, percent). `0.0` for a zero mean.
    #[must_use]
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_all_zero() {
        let stats = Statistics::from_samples(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.median, 0.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn test_single_sample_has_zero_stddev() {
        let stats = Statistics::from_samples(&[42.5]);
        assert_eq!(stats.mean, 42.5);
        assert_eq!(stats.median, 42.5);
        assert_eq!(stats.min, 42.5);
        assert_eq!(stats.max, 42.5);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_even_count_median() {
        let stats = Statistics::from_samples(&[4.0, 1.0, 3.0, 2.0]);
        assert!((stats.median - 2.5).abs() < f64::EPSILON);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_sample_stddev_matches_n_minus_one() {
        // 2, 4, 4, 4, 5, 5, 7, 9: population stddev 2, sample stddev sqrt(32/7)
        let stats = Statistics::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_order_insensitive_bitwise() {
        let a = Statistics::from_samples(&[0.1, 0.2, 0.3, 1e9, 7.7]);
        let b = Statistics::from_samples(&[1e9, 7.7, 0.3, 0.1, 0.2]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let stats = Statistics::from_samples(&[9.0, 11.0]);
        let expected = (2.0_f64.sqrt() / 10.0) * 100.0;
        assert!((stats.coefficient_of_variation() - expected).abs() < 1e-9);
    }
}
