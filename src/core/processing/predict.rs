//! Per-pixel elevation predictor: learn after-elevation from (row, col,
//! before-elevation) on a training split and report signed errors on the
//! held-out split.
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::params::PipelineParams;
use crate::core::processing::features::FeatureTable;
use crate::core::processing::sampling::train_test_split;
use crate::core::processing::tree::DecisionTreeRegressor;
use crate::error::{Error, Result};

/// One evaluated pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted: f64,
    pub actual: f64,
    /// predicted - actual
    pub error: f64,
}

impl PredictionRecord {
    pub fn new(predicted: f64, actual: f64) -> Self {
        Self {
            predicted,
            actual,
            error: predicted - actual,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegionPrediction {
    pub records: Vec<PredictionRecord>,
    /// Rows in the feature table before cleaning (rows x cols)
    pub total_rows: usize,
    /// Rows left after removing missing values
    pub valid_rows: usize,
    pub train_rows: usize,
}

impl RegionPrediction {
    pub fn errors(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.error).collect()
    }
}

/// Fit a regression tree on a `before`/`after` pair and evaluate it on the
/// held-out pixels. Missing pixels are `NaN`.
pub fn predict_elevation(
    before: ArrayView2<f64>,
    after: ArrayView2<f64>,
    params: &PipelineParams,
) -> Result<RegionPrediction> {
    let table = FeatureTable::from_grids(before, after)?;
    let total_rows = table.len();

    let clean = table.drop_missing();
    let valid_rows = clean.len();
    debug!(
        "Feature table: {} rows, {} valid after dropping missing values",
        total_rows, valid_rows
    );
    if clean.is_empty() {
        return Err(Error::NoValidData);
    }

    let split = train_test_split(valid_rows, params.test_fraction, params.split_seed);
    if split.train.is_empty() {
        return Err(Error::InsufficientData { rows: valid_rows });
    }

    let train = clean.select(&split.train);
    let eval = clean.select(&split.eval);

    let mut model = DecisionTreeRegressor::new(params.tree_seed);
    model.fit(train.features.view(), train.target.view())?;
    let predicted = model.predict(eval.features.view())?;

    let records: Vec<PredictionRecord> = predicted
        .iter()
        .zip(eval.target.iter())
        .map(|(&p, &a)| PredictionRecord::new(p, a))
        .collect();

    info!(
        "Predicted {} evaluation pixels from {} training pixels ({} tree leaves)",
        records.len(),
        train.len(),
        model.n_leaves()
    );

    Ok(RegionPrediction {
        records,
        total_rows,
        valid_rows,
        train_rows: train.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn synthetic_pair(rows: usize, cols: usize) -> (Array2<f64>, Array2<f64>) {
        let before = Array2::from_shape_fn((rows, cols), |(r, c)| 4000.0 + r as f64 * 0.5 + c as f64);
        let after = before.mapv(|v| v - 0.25);
        (before, after)
    }

    #[test]
    fn two_by_two_example_leaves_three_rows() {
        let before = array![[10.0, 12.0], [9.0, f64::NAN]];
        let after = array![[11.0, 13.0], [8.0, 7.0]];
        let out = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap();
        assert_eq!(out.total_rows, 4);
        assert_eq!(out.valid_rows, 3);
        assert_eq!(out.train_rows + out.records.len(), 3);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn signed_error_is_exact() {
        let (before, after) = synthetic_pair(12, 9);
        let out = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap();
        for r in &out.records {
            assert_eq!(r.error, r.predicted - r.actual);
        }
    }

    #[test]
    fn partition_sizes_sum_to_valid_rows() {
        let (mut before, after) = synthetic_pair(10, 10);
        before[[0, 0]] = f64::NAN;
        before[[5, 5]] = f64::NAN;
        let out = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap();
        assert_eq!(out.total_rows, 100);
        assert_eq!(out.valid_rows, 98);
        assert_eq!(out.train_rows + out.records.len(), 98);
        let expected_eval = 0.3 * 98.0;
        assert!((out.records.len() as f64 - expected_eval).abs() <= 1.0);
    }

    #[test]
    fn fixed_seed_reproduces_errors() {
        let (before, after) = synthetic_pair(15, 15);
        let params = PipelineParams::default();
        let a = predict_elevation(before.view(), after.view(), &params).unwrap();
        let b = predict_elevation(before.view(), after.view(), &params).unwrap();
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn all_missing_before_is_no_valid_data() {
        let before = Array2::<f64>::from_elem((4, 4), f64::NAN);
        let after = Array2::<f64>::from_elem((4, 4), 100.0);
        let err = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap_err();
        assert!(matches!(err, Error::NoValidData));
    }

    #[test]
    fn single_valid_pixel_is_insufficient() {
        let before = array![[1.0, f64::NAN]];
        let after = array![[2.0, 3.0]];
        let err = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { rows: 1 }));
    }

    #[test]
    fn shape_mismatch_rejected_before_fitting() {
        let before = Array2::<f64>::zeros((3, 3));
        let after = Array2::<f64>::zeros((3, 4));
        let err = predict_elevation(before.view(), after.view(), &PipelineParams::default()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
