//! Per-pixel feature table for the elevation regressor.
//!
//! Rows follow column-major raster traversal: all rows of column 0 top to
//! bottom, then column 1, and so on. Row `i` of the table is pixel
//! `(i % rows, i / rows)` of the source grid before missing values are dropped.
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Column indices of the feature matrix.
pub const ROW: usize = 0;
pub const COL: usize = 1;
pub const BEFORE: usize = 2;
pub const N_FEATURES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Columns: row index, column index, before-elevation
    pub features: Array2<f64>,
    /// After-elevation
    pub target: Array1<f64>,
}

impl FeatureTable {
    /// One row per pixel of the `before`/`after` pair. The shapes must match.
    pub fn from_grids(before: ArrayView2<f64>, after: ArrayView2<f64>) -> Result<Self> {
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
        let n = rows * cols;
        let mut features = Array2::<f64>::zeros((n, N_FEATURES));
        let mut target = Array1::<f64>::zeros(n);

        let mut i = 0;
        for c in 0..cols {
            for r in 0..rows {
                features[[i, ROW]] = r as f64;
                features[[i, COL]] = c as f64;
                features[[i, BEFORE]] = before[[r, c]];
                target[i] = after[[r, c]];
                i += 1;
            }
        }

        Ok(FeatureTable { features, target })
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Copy of the table without rows that have a missing feature or target.
    pub fn drop_missing(&self) -> FeatureTable {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| {
                !self.target[i].is_nan() && self.features.row(i).iter().all(|v| !v.is_nan())
            })
            .collect();
        self.select(&keep)
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            features: self.features.select(Axis(0), indices),
            target: self.target.select(Axis(0), indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn one_row_per_pixel_in_column_major_order() {
        let before = array![[10.0, 12.0, 14.0], [9.0, 11.0, 13.0]];
        let after = before.mapv(|v| v + 1.0);
        let table = FeatureTable::from_grids(before.view(), after.view()).unwrap();
        assert_eq!(table.len(), 6);
        // Down column 0 first
        assert_eq!(table.features.row(0).to_vec(), vec![0.0, 0.0, 10.0]);
        assert_eq!(table.features.row(1).to_vec(), vec![1.0, 0.0, 9.0]);
        assert_eq!(table.features.row(2).to_vec(), vec![0.0, 1.0, 12.0]);
        assert_eq!(table.features.row(5).to_vec(), vec![1.0, 2.0, 13.0]);
        assert_eq!(table.target[5], 14.0);
    }

    #[test]
    fn two_by_two_example_drops_missing_before_pixel() {
        let before = array![[10.0, 12.0], [9.0, f64::NAN]];
        let after = array![[11.0, 13.0], [8.0, 7.0]];
        let table = FeatureTable::from_grids(before.view(), after.view()).unwrap();
        assert_eq!(table.len(), 4);

        let clean = table.drop_missing();
        assert_eq!(clean.len(), 3);
        // Pixel (1, 1) is the last row in column-major order
        for i in 0..clean.len() {
            let (r, c) = (clean.features[[i, ROW]], clean.features[[i, COL]]);
            assert!(!(r == 1.0 && c == 1.0));
        }
        assert_eq!(clean.target.to_vec(), vec![11.0, 8.0, 13.0]);
    }

    #[test]
    fn drop_missing_keeps_every_fully_valid_row() {
        let before = array![[1.0, f64::NAN, 3.0], [4.0, 5.0, 6.0]];
        let after = array![[1.5, 2.5, f64::NAN], [4.5, 5.5, 6.5]];
        let table = FeatureTable::from_grids(before.view(), after.view()).unwrap();
        let clean = table.drop_missing();
        let valid = before
            .iter()
            .zip(after.iter())
            .filter(|(b, a)| !b.is_nan() && !a.is_nan())
            .count();
        assert_eq!(clean.len(), valid);
        assert!(clean.features.iter().all(|v| !v.is_nan()));
        assert!(clean.target.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn mismatched_shapes_rejected() {
        let before = Array2::<f64>::zeros((2, 3));
        let after = Array2::<f64>::zeros((3, 2));
        let err = FeatureTable::from_grids(before.view(), after.view()).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { before_rows: 2, before_cols: 3, after_rows: 3, after_cols: 2 }
        ));
    }
}
