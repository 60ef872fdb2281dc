//! Core building blocks: the raster and region model, processing parameters,
//! and the per-stage algorithms (resampling, terrain attributes, regression,
//! error statistics, outlier filtering, clustering). These are the primitives
//! consumed by the high-level `api` module.
pub mod params;
pub mod processing;
pub mod raster;
pub mod region;
