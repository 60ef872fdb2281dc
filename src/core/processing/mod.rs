pub mod cluster;
pub mod features;
pub mod outliers;
pub mod predict;
pub mod resample;
pub mod sampling;
pub mod stats;
pub mod terrain;
pub mod tree;

pub use cluster::{KMeans1d, SlopeClusterRecord, cluster_slope_difference};
pub use features::FeatureTable;
pub use outliers::OutlierFilter;
pub use predict::{PredictionRecord, RegionPrediction, predict_elevation};
pub use resample::{AlignmentReport, validate_alignment};
pub use stats::{ErrorStats, land_coverage_percent};
pub use terrain::{aspect_degrees, slope_degrees};
pub use tree::{DecisionTreeRegressor, TreeError};
