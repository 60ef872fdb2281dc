//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, CSV, image, model and clustering errors, and provides
//! semantic variants for the per-region failure conditions of the pipeline.
use thiserror::Error;

use crate::types::TimePoint;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] crate::core::processing::tree::TreeError),

    #[error("Clustering error: {0}")]
    Clustering(#[from] linfa_clustering::KMeansError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing {side} raster for region `{key}`")]
    MissingInput { key: String, side: TimePoint },

    #[error("Dimension mismatch: before is {before_rows}x{before_cols}, after is {after_rows}x{after_cols}")]
    DimensionMismatch {
        before_rows: usize,
        before_cols: usize,
        after_rows: usize,
        after_cols: usize,
    },

    #[error("Rasters are not aligned: {0}")]
    Misaligned(String),

    #[error("No valid data: every pixel is missing in the before or after raster")]
    NoValidData,

    #[error("Insufficient data: {rows} valid pixel(s) leave an empty training partition")]
    InsufficientData { rows: usize },

    #[error("Error table is empty: {0}")]
    EmptyErrorTable(String),
}

impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(crate::io::GdalError::Gdal(e))
    }
}
