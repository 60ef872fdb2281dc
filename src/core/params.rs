use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{OutlierPolicy, ResampleMethod};

/// Stem suffix of "before" rasters as delivered.
pub const BEFORE_SUFFIX: &str = "Before";
/// Stem suffix of "after" rasters.
pub const AFTER_SUFFIX: &str = "After";
/// Suffix appended to the stem of a re-gridded "before" raster.
pub const RESAMPLED_SUFFIX: &str = "_Resampled";

/// Processing parameters suitable for config files and CLI presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Fraction of valid pixels held out for evaluation
    pub test_fraction: f64,
    /// Seed of the train/evaluation shuffle; None draws from OS entropy
    pub split_seed: Option<u64>,
    /// Seed of the per-node feature permutation in the regression tree
    pub tree_seed: u64,
    pub resample_method: ResampleMethod,
    pub outlier_policy: OutlierPolicy,
    pub z_threshold: f64,
    pub quantile_low: f64,
    pub quantile_high: f64,
    /// Number of errors drawn for the sampled plots
    pub sample_size: usize,
    pub plot_seed: u64,
    pub cluster_count: usize,
    pub cluster_seed: u64,
    /// Process regions on a rayon pool instead of one after another
    pub parallel: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.30,
            split_seed: Some(42),
            tree_seed: 0,
            resample_method: ResampleMethod::Nearest,
            outlier_policy: OutlierPolicy::QuantileClip,
            z_threshold: 3.0,
            quantile_low: 0.01,
            quantile_high: 0.99,
            sample_size: 100,
            plot_seed: 7,
            cluster_count: 4,
            cluster_seed: 0,
            parallel: false,
        }
    }
}

impl PipelineParams {
    /// Load parameters from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: PipelineParams = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::InvalidArgument {
                arg: "test_fraction",
                value: self.test_fraction.to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.quantile_low)
            || !(0.0..=1.0).contains(&self.quantile_high)
            || self.quantile_low >= self.quantile_high
        {
            return Err(Error::InvalidArgument {
                arg: "quantile_low/quantile_high",
                value: format!("{}/{}", self.quantile_low, self.quantile_high),
            });
        }
        if self.z_threshold <= 0.0 {
            return Err(Error::InvalidArgument {
                arg: "z_threshold",
                value: self.z_threshold.to_string(),
            });
        }
        if self.cluster_count == 0 {
            return Err(Error::InvalidArgument {
                arg: "cluster_count",
                value: "0".to_string(),
            });
        }
        if self.sample_size == 0 {
            return Err(Error::InvalidArgument {
                arg: "sample_size",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Where each stage reads and writes its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineLayout {
    /// Clipped before/after DEMs; resampled rasters are written here too
    pub input_dir: PathBuf,
    /// Root of the `slope/` and `aspect/` output directories
    pub terrain_dir: PathBuf,
    /// Per-region error tables, cluster tables and the summary table
    pub tables_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl PipelineLayout {
    /// Conventional layout under a single working directory.
    pub fn under(root: &Path) -> Self {
        Self {
            input_dir: root.join("rasters"),
            terrain_dir: root.join("terrain"),
            tables_dir: root.join("tables"),
            images_dir: root.join("images"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = PipelineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.split_seed, Some(42));
        assert_eq!(params.outlier_policy, OutlierPolicy::QuantileClip);
        assert_eq!(params.resample_method, ResampleMethod::Nearest);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "split_seed": null, "cluster_count": 3 }"#).unwrap();
        let params = PipelineParams::from_json_file(&path).unwrap();
        assert_eq!(params.split_seed, None);
        assert_eq!(params.cluster_count, 3);
        assert_eq!(params.test_fraction, 0.30);
    }

    #[test]
    fn rejects_out_of_range_test_fraction() {
        let params = PipelineParams {
            test_fraction: 1.0,
            ..PipelineParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidArgument { arg: "test_fraction", .. })
        ));
    }

    #[test]
    fn rejects_inverted_quantiles() {
        let params = PipelineParams {
            quantile_low: 0.9,
            quantile_high: 0.1,
            ..PipelineParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn layout_under_root() {
        let layout = PipelineLayout::under(Path::new("/work"));
        assert_eq!(layout.tables_dir, PathBuf::from("/work/tables"));
    }
}
