use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::TimePoint;

/// One before/after study area.
///
/// `key` is derived from the raster filename (stem without the time-point
/// suffix) and `index` is its 1-based position after sorting all keys, so
/// region identity never depends on directory listing order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region {
    pub index: usize,
    pub key: String,
}

impl Region {
    pub fn new(index: usize, key: impl Into<String>) -> Self {
        Self {
            index,
            key: key.into(),
        }
    }

    /// Zero-padded index used in artifact names (`01`, `02`, ...).
    pub fn tag(&self) -> String {
        format!("{:02}", self.index)
    }

    /// `{NN}_Area_{NN}_error.csv`
    pub fn error_table_name(&self) -> String {
        format!("{0}_Area_{0}_error.csv", self.tag())
    }

    /// `{NN}_Area_{NN}_slope_clusters.csv`
    pub fn cluster_table_name(&self) -> String {
        format!("{0}_Area_{0}_slope_clusters.csv", self.tag())
    }

    /// `Area_{NN}_{suffix}.png`
    pub fn plot_name(&self, suffix: &str) -> String {
        format!("Area_{}_{}.png", self.tag(), suffix)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region {} ({})", self.index, self.key)
    }
}

/// Paired raster paths of a region; a side is `None` when no file matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionPair {
    pub region: Region,
    pub before: Option<PathBuf>,
    pub after: Option<PathBuf>,
}

impl RegionPair {
    pub fn before_path(&self) -> Result<&PathBuf> {
        self.before.as_ref().ok_or_else(|| Error::MissingInput {
            key: self.region.key.clone(),
            side: TimePoint::Before,
        })
    }

    pub fn after_path(&self) -> Result<&PathBuf> {
        self.after.as_ref().ok_or_else(|| Error::MissingInput {
            key: self.region.key.clone(),
            side: TimePoint::After,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_are_zero_padded() {
        let r = Region::new(3, "03_Area_");
        assert_eq!(r.error_table_name(), "03_Area_03_error.csv");
        assert_eq!(r.plot_name("A_All"), "Area_03_A_All.png");
        assert_eq!(r.cluster_table_name(), "03_Area_03_slope_clusters.csv");
    }

    #[test]
    fn missing_side_is_reported() {
        let pair = RegionPair {
            region: Region::new(1, "01_Area_"),
            before: Some(PathBuf::from("01_Area_Before.tif")),
            after: None,
        };
        assert!(!pair.is_complete());
        assert!(pair.before_path().is_ok());
        match pair.after_path() {
            Err(Error::MissingInput { key, side }) => {
                assert_eq!(key, "01_Area_");
                assert_eq!(side, TimePoint::After);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
