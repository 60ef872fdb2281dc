//! Shared types and enums used across demdelta.
//! Includes pipeline `Stage`s, `TimePoint`, `TerrainAttribute`,
//! `ResampleMethod` and the canonical `OutlierPolicy`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Pipeline stage a region is in; used to label failures.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Resample,
    TerrainAttribute,
    Predict,
    Aggregate,
    Visualize,
    Cluster,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Resample => "resample",
            Stage::TerrainAttribute => "terrain-attribute",
            Stage::Predict => "predict",
            Stage::Aggregate => "aggregate",
            Stage::Visualize => "visualize",
            Stage::Cluster => "cluster",
        };
        write!(f, "{}", s)
    }
}

/// Acquisition time of a raster relative to the flood event.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum TimePoint {
    Before,
    After,
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimePoint::Before => write!(f, "before"),
            TimePoint::After => write!(f, "after"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum TerrainAttribute {
    Slope,
    Aspect,
}

impl TerrainAttribute {
    /// Output sub-directory and filename suffix for this attribute.
    pub fn suffix(&self) -> &'static str {
        match self {
            TerrainAttribute::Slope => "slope",
            TerrainAttribute::Aspect => "aspect",
        }
    }
}

impl std::fmt::Display for TerrainAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Resampling kernel used when re-gridding a "before" DEM.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
    Cubic,
    Lanczos,
    Average,
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleMethod::Nearest => write!(f, "Nearest"),
            ResampleMethod::Bilinear => write!(f, "Bilinear"),
            ResampleMethod::Cubic => write!(f, "Cubic"),
            ResampleMethod::Lanczos => write!(f, "Lanczos"),
            ResampleMethod::Average => write!(f, "Average"),
        }
    }
}

/// Outlier filter applied to error series before plotting.
///
/// A single policy is chosen per run and applied to every filtered figure.
/// `QuantileClip` is the canonical default.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum OutlierPolicy {
    /// Keep values strictly between the low and high quantiles.
    QuantileClip,
    /// Keep values whose absolute z-score is below the threshold.
    ZScore,
}

impl std::fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlierPolicy::QuantileClip => write!(f, "QuantileClip"),
            OutlierPolicy::ZScore => write!(f, "ZScore"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_kebab_case() {
        assert_eq!(Stage::TerrainAttribute.to_string(), "terrain-attribute");
        assert_eq!(Stage::Predict.to_string(), "predict");
        let json = serde_json::to_string(&Stage::TerrainAttribute).unwrap();
        assert_eq!(json, "\"terrain-attribute\"");
    }

    #[test]
    fn terrain_suffixes() {
        assert_eq!(TerrainAttribute::Slope.suffix(), "slope");
        assert_eq!(TerrainAttribute::Aspect.to_string(), "aspect");
    }
}
