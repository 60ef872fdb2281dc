//! In-memory elevation grid with georeferencing.
//!
//! Missing pixels are stored as `NaN`. Raw DEMs mark no-data with negative
//! elevations; `Raster::mask_negative` maps those to `NaN` once after loading.
use ndarray::Array2;

/// Grid geometry shared by every raster of a region after resampling
#[derive(Debug, Clone, PartialEq)]
pub struct GridInfo {
    pub width: usize,
    pub height: usize,
    /// Affine geotransform ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection in WKT format (may be empty)
    pub projection: String,
    /// No-data value declared by the source band, if any
    pub no_data: Option<f64>,
}

impl GridInfo {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            geotransform: [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            projection: String::new(),
            no_data: None,
        }
    }

    /// Pixel resolution (x, y) as stored in the geotransform; y is usually negative.
    pub fn resolution(&self) -> (f64, f64) {
        (self.geotransform[1], self.geotransform[5])
    }

    /// Geotransform after re-gridding the same extent to `width` x `height`.
    pub fn regridded(&self, width: usize, height: usize) -> GridInfo {
        let mut gt = self.geotransform;
        // Column terms scale with the width ratio, row terms with the height ratio
        if width > 0 {
            let sx = self.width as f64 / width as f64;
            gt[1] *= sx;
            gt[4] *= sx;
        }
        if height > 0 {
            let sy = self.height as f64 / height as f64;
            gt[2] *= sy;
            gt[5] *= sy;
        }
        GridInfo {
            width,
            height,
            geotransform: gt,
            projection: self.projection.clone(),
            no_data: self.no_data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Raster {
    /// Shape (height, width)
    pub data: Array2<f64>,
    pub grid: GridInfo,
}

impl Raster {
    pub fn new(data: Array2<f64>, grid: GridInfo) -> Self {
        Self { data, grid }
    }

    /// Raster with an identity geotransform, mostly for tests and synthetic inputs.
    pub fn from_array(data: Array2<f64>) -> Self {
        let (rows, cols) = data.dim();
        Self {
            data,
            grid: GridInfo::new(cols, rows),
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Map negative elevations and the declared no-data value to `NaN`.
    /// Returns the number of pixels newly masked.
    pub fn mask_negative(&mut self) -> usize {
        let no_data = self.grid.no_data;
        let mut masked = 0;
        for v in self.data.iter_mut() {
            if v.is_nan() {
                continue;
            }
            let is_sentinel = no_data.is_some_and(|nd| *v == nd);
            if *v < 0.0 || is_sentinel {
                *v = f64::NAN;
                masked += 1;
            }
        }
        masked
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Percentage of non-missing pixels, in [0, 100].
    pub fn land_coverage_percent(&self) -> f64 {
        crate::core::processing::stats::land_coverage_percent(&self.data)
    }
}
