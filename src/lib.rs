#![doc = r#"
demdelta: before/after DEM change analysis for flood-impact studies.

For every study region the crate pairs a "before" and an "after" digital
elevation model, re-grids the before DEM onto the after grid, derives slope
and aspect rasters, fits a per-pixel decision-tree regressor that predicts
after-elevation from pixel position and before-elevation, and reports how
well it does: per-region error tables, a summary table, error line charts and
a k-means clustering of slope change. It powers the `demdelta` CLI and can be
embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.

Quick start: run the whole pipeline
-----------------------------------
```rust,no_run
use std::path::Path;
use demdelta::{PipelineLayout, PipelineParams, run_pipeline};

fn main() -> demdelta::Result<()> {
    // Expects rasters/01_Area_Before.tif, rasters/01_Area_After.tif, ...
    let layout = PipelineLayout::under(Path::new("/data/flood-study"));
    let report = run_pipeline(&layout, &PipelineParams::default())?;
    for failure in report.failures() {
        eprintln!("{} failed at {}: {}", failure.region, failure.stage, failure.message);
    }
    Ok(())
}
```

Per-region prediction in memory
-------------------------------
```rust,no_run
use demdelta::{PipelineParams, load_dem, predict_elevation};

fn main() -> demdelta::Result<()> {
    let before = load_dem("/data/01_Area_Before_Resampled.tif")?;
    let after = load_dem("/data/01_Area_After.tif")?;
    let out = predict_elevation(before.data.view(), after.data.view(), &PipelineParams::default())?;
    println!("{} evaluation pixels", out.records.len());
    Ok(())
}
```

Error handling
--------------
All fallible operations return `demdelta::Result<T>`. Per-region failures
inside directory runs do not abort the batch; they are collected in
[`BatchReport`] with the stage that failed.

Useful modules
--------------
- [`api`]: per-stage and whole-pipeline entry points.
- [`core`]: rasters, regions, parameters and the numeric stages.
- [`types`]: shared enums (`Stage`, `ResampleMethod`, `OutlierPolicy`, ...).
- [`io`]: GDAL reader, region discovery, GeoTIFF/CSV/PNG writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Types
pub use crate::core::params::{PipelineLayout, PipelineParams};
pub use crate::core::raster::{GridInfo, Raster};
pub use crate::core::region::{Region, RegionPair};
pub use error::{Error, Result};
pub use types::{OutlierPolicy, ResampleMethod, Stage, TerrainAttribute, TimePoint};

// Numeric stages
pub use crate::core::processing::{
    AlignmentReport, DecisionTreeRegressor, ErrorStats, FeatureTable, KMeans1d, OutlierFilter,
    PredictionRecord, RegionPrediction, SlopeClusterRecord, aspect_degrees, cluster_slope_difference,
    land_coverage_percent, predict_elevation, slope_degrees, validate_alignment,
};

// Readers
pub use io::gdal::{DemReader, GdalError, load_dem};
pub use io::discovery::{discover_regions, discover_regions_indexed};

// High-level API re-exports
pub use api::{
    BatchReport, PipelineReport, RegionFailure, RegionOutcome, SummaryRow, cluster_directory,
    plot_directory, predict_directory, predict_region, resample_directory, resample_region,
    resample_to_match, run_pipeline, summarize_directory, terrain_directory, terrain_region,
};
