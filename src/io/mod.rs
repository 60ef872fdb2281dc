//! I/O layer: GDAL-backed DEM reading, region discovery, and `writers`
//! for GeoTIFF rasters, CSV tables and PNG charts.
pub mod discovery;
pub use self::discovery::{discover_regions, discover_regions_indexed};

pub mod gdal;
pub use self::gdal::{DemReader, GdalError, load_dem};

pub mod writers;
