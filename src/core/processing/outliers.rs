use tracing::debug;

use crate::core::params::PipelineParams;
use crate::core::processing::stats::{mean_and_population_std, quantile_sorted, sorted_finite};
use crate::types::OutlierPolicy;

/// Bounds and thresholds for outlier filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    pub policy: OutlierPolicy,
    pub quantile_low: f64,
    pub quantile_high: f64,
    pub z_threshold: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            policy: OutlierPolicy::QuantileClip,
            quantile_low: 0.01,
            quantile_high: 0.99,
            z_threshold: 3.0,
        }
    }
}

impl From<&PipelineParams> for OutlierFilter {
    fn from(params: &PipelineParams) -> Self {
        Self {
            policy: params.outlier_policy,
            quantile_low: params.quantile_low,
            quantile_high: params.quantile_high,
            z_threshold: params.z_threshold,
        }
    }
}

impl OutlierFilter {
    /// Keep the values that are not outliers, preserving order. `NaN`s are dropped.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let kept = match self.policy {
            OutlierPolicy::QuantileClip => quantile_clip(values, self.quantile_low, self.quantile_high),
            OutlierPolicy::ZScore => z_score(values, self.z_threshold),
        };
        debug!(
            "Outlier filter ({}): kept {} of {} values",
            self.policy,
            kept.len(),
            values.len()
        );
        kept
    }
}

/// Values strictly between the `low` and `high` quantiles.
pub fn quantile_clip(values: &[f64], low: f64, high: f64) -> Vec<f64> {
    let sorted = sorted_finite(values);
    let (Some(lo), Some(hi)) = (quantile_sorted(&sorted, low), quantile_sorted(&sorted, high)) else {
        return Vec::new();
    };
    values
        .iter()
        .copied()
        .filter(|&v| v > lo && v < hi)
        .collect()
}

/// Values whose population z-score is below `threshold` in magnitude.
/// A zero-variance series is returned whole.
pub fn z_score(values: &[f64], threshold: f64) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let Some((mean, std)) = mean_and_population_std(&finite) else {
        return Vec::new();
    };
    if std == 0.0 {
        return finite;
    }
    finite
        .into_iter()
        .filter(|&v| ((v - mean) / std).abs() < threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_clip_drops_both_tails() {
        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let kept = quantile_clip(&values, 0.01, 0.99);
        // 1st percentile is 1.0, 99th is 99.0; both excluded
        assert_eq!(kept.first(), Some(&2.0));
        assert_eq!(kept.last(), Some(&98.0));
        assert_eq!(kept.len(), 97);
    }

    #[test]
    fn quantile_clip_keeps_order() {
        let values = [5.0, -100.0, 1.0, 3.0, 100.0, 2.0, 4.0];
        let kept = quantile_clip(&values, 0.01, 0.99);
        assert_eq!(kept, vec![5.0, 1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn z_score_removes_spike() {
        let mut values = vec![0.0; 50];
        for (i, v) in values.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 0.01 } else { -0.01 };
        }
        values.push(10.0);
        let kept = z_score(&values, 3.0);
        assert_eq!(kept.len(), 50);
        assert!(kept.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn z_score_keeps_constant_series() {
        let values = [0.2; 8];
        assert_eq!(z_score(&values, 3.0).len(), 8);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let filter = OutlierFilter::default();
        assert!(filter.apply(&[]).is_empty());
        let z = OutlierFilter {
            policy: OutlierPolicy::ZScore,
            ..OutlierFilter::default()
        };
        assert!(z.apply(&[f64::NAN]).is_empty());
    }
}
