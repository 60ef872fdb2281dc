use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Percentage of non-`NaN` cells, in [0, 100]. An empty grid has 0 % coverage.
pub fn land_coverage_percent(data: &Array2<f64>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let valid = data.iter().filter(|v| !v.is_nan()).count();
    valid as f64 / data.len() as f64 * 100.0
}

/// Quantile of already sorted values with linear interpolation between
/// order statistics: position `q * (n - 1)`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Sort a copy of `values`, dropping `NaN`s.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Mean and population standard deviation (Welford), `None` when empty.
pub fn mean_and_population_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut mean = 0.0_f64;
    let mut m2 = 0.0_f64;
    for (i, &v) in values.iter().enumerate() {
        let delta = v - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (v - mean);
    }
    Some((mean, (m2 / values.len() as f64).sqrt()))
}

/// Descriptive statistics of absolute prediction error for one region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); `NaN` for a single value
    pub std: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl ErrorStats {
    /// Statistics of `|e|` over the signed errors `errors`. `NaN` entries are ignored.
    pub fn from_errors(errors: &[f64]) -> Result<Self> {
        let abs: Vec<f64> = errors.iter().map(|e| e.abs()).collect();
        let sorted = sorted_finite(&abs);
        let count = sorted.len();
        if count == 0 {
            return Err(Error::EmptyErrorTable(
                "no finite error values to summarize".to_string(),
            ));
        }

        let (mean, pop_std) = mean_and_population_std(&sorted).unwrap_or((0.0, 0.0));
        let std = if count > 1 {
            (pop_std * pop_std * count as f64 / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Ok(ErrorStats {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            std,
            p25: quantile_sorted(&sorted, 0.25).unwrap_or(f64::NAN),
            p50: quantile_sorted(&sorted, 0.50).unwrap_or(f64::NAN),
            p75: quantile_sorted(&sorted, 0.75).unwrap_or(f64::NAN),
        })
    }
}
