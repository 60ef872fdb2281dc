//! One-dimensional k-means over slope differences (before − after), fitted
//! with `linfa-clustering` and relabelled so cluster `0` has the lowest centre.
use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::processing::sampling::rng_from_seed;
use crate::error::{Error, Result};

pub const MAX_ITERATIONS: u64 = 300;
pub const TOLERANCE: f64 = 1e-6;
/// Independent k-means++ restarts; the lowest-inertia run wins.
pub const RESTARTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeClusterRecord {
    pub slope_before: f64,
    pub slope_after: f64,
    pub difference: f64,
    pub cluster: usize,
}

/// Fitted 1-D k-means. Cluster `0` has the smallest centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans1d {
    pub centroids: Vec<f64>,
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

impl KMeans1d {
    /// Cluster `values` (no `NaN`s) into at most `k` groups.
    pub fn fit(values: &[f64], k: usize, seed: u64) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::NoValidData);
        }
        if k == 0 {
            return Err(Error::InvalidArgument {
                arg: "cluster_count",
                value: "0".to_string(),
            });
        }
        let k = k.min(distinct_count(values));

        let observations: Array2<f64> = Array1::from(values.to_vec()).insert_axis(Axis(1));
        let dataset = DatasetBase::from(observations.clone());
        let model = KMeans::params_with_rng(k, rng_from_seed(Some(seed)))
            .n_runs(RESTARTS)
            .max_n_iterations(MAX_ITERATIONS)
            .tolerance(TOLERANCE)
            .fit(&dataset)?;
        let raw_labels: Array1<usize> = model.predict(&observations);

        // Rank of each fitted centre in ascending order
        let raw_centroids: Vec<f64> = model.centroids().column(0).to_vec();
        let mut order: Vec<usize> = (0..raw_centroids.len()).collect();
        order.sort_by(|&a, &b| raw_centroids[a].total_cmp(&raw_centroids[b]));
        let mut rank = vec![0usize; order.len()];
        for (position, &cluster) in order.iter().enumerate() {
            rank[cluster] = position;
        }

        let centroids: Vec<f64> = order.iter().map(|&c| raw_centroids[c]).collect();
        let labels: Vec<usize> = raw_labels.iter().map(|&l| rank[l]).collect();
        let inertia: f64 = labels
            .iter()
            .zip(values)
            .map(|(&l, &v)| (v - centroids[l]).powi(2))
            .sum();

        debug!("k-means: k={} over {} value(s), inertia {:.6}", k, values.len(), inertia);
        Ok(KMeans1d {
            centroids,
            labels,
            inertia,
        })
    }
}

/// Pairs of finite slopes and their difference, in column-major order.
pub fn slope_differences(before: ArrayView2<f64>, after: ArrayView2<f64>) -> Result<Vec<(f64, f64, f64)>> {
    if before.dim() != after.dim() {
        let (before_rows, before_cols) = before.dim();
        let (after_rows, after_cols) = after.dim();
        return Err(Error::DimensionMismatch {
            before_rows,
            before_cols,
            after_rows,
            after_cols,
        });
    }
    let (rows, cols) = before.dim();
    let mut out = Vec::new();
    for c in 0..cols {
        for r in 0..rows {
            let (b, a) = (before[[r, c]], after[[r, c]]);
            if !b.is_nan() && !a.is_nan() {
                out.push((b, a, b - a));
            }
        }
    }
    Ok(out)
}

/// Cluster the slope difference of a region and label each pixel.
pub fn cluster_slope_difference(
    before: ArrayView2<f64>,
    after: ArrayView2<f64>,
    k: usize,
    seed: u64,
) -> Result<Vec<SlopeClusterRecord>> {
    let pairs = slope_differences(before, after)?;
    let diffs: Vec<f64> = pairs.iter().map(|p| p.2).collect();
    let model = KMeans1d::fit(&diffs, k, seed)?;
    Ok(pairs
        .into_iter()
        .zip(model.labels)
        .map(|((slope_before, slope_after, difference), cluster)| SlopeClusterRecord {
            slope_before,
            slope_after,
            difference,
            cluster,
        })
        .collect())
}
