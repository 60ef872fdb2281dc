use gdal::raster::{Buffer, ResampleAlg};
use gdal::{Dataset, DriverManager, Metadata, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::raster::{GridInfo, Raster};
use crate::types::ResampleMethod;

/// Errors encountered when using the GDAL reader
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2} values")]
    DimensionMismatch(usize, usize, usize),
}

/// Reader for single-band elevation rasters via GDAL
pub struct DemReader {
    pub dataset: Dataset,
    pub grid: GridInfo,
    pub bands: usize,
    /// Dataset metadata entries (domain "")
    pub metadata: HashMap<String, String>,
}

/// EPSG code from the last WKT authority tag, e.g. `EPSG:32611`
pub fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(idx) = wkt.rfind(KEY) {
        let start = idx + KEY.len();
        if let Some(end) = wkt[start..].find('"') {
            let code = &wkt[start..start + end];
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

/// GDAL RasterIO kernel for a resampling method
pub fn resample_alg(method: ResampleMethod) -> ResampleAlg {
    match method {
        ResampleMethod::Nearest => ResampleAlg::NearestNeighbour,
        ResampleMethod::Bilinear => ResampleAlg::Bilinear,
        ResampleMethod::Cubic => ResampleAlg::Cubic,
        ResampleMethod::Lanczos => ResampleAlg::Lanczos,
        ResampleMethod::Average => ResampleAlg::Average,
    }
}

impl DemReader {
    /// Open a GDAL-supported raster (GeoTIFF in practice)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let projection = dataset.projection();
        let no_data = dataset.rasterband(1)?.no_data_value();

        let mut metadata = HashMap::new();
        if let Some(entries) = dataset.metadata_domain("") {
            for entry in entries {
                if let Some((key, val)) = entry.split_once('=') {
                    metadata.insert(key.to_string(), val.to_string());
                }
            }
        }

        debug!(
            "Opened {:?}: {}x{}, {} band(s), {}",
            path.as_ref(),
            size_x,
            size_y,
            bands,
            parse_epsg(&projection).unwrap_or_else(|| "no EPSG code".to_string())
        );

        Ok(DemReader {
            dataset,
            grid: GridInfo {
                width: size_x as usize,
                height: size_y as usize,
                geotransform,
                projection,
                no_data,
            },
            bands,
            metadata,
        })
    }

    fn check_band(&self, index: usize) -> Result<(), GdalError> {
        if index == 0 || index > self.bands {
            return Err(GdalError::UnsupportedFormat(format!(
                "Band index {} out of range",
                index
            )));
        }
        Ok(())
    }

    /// Read a band (1-based index) at native resolution, shape (height, width)
    pub fn read_band(&self, index: usize) -> Result<Array2<f64>, GdalError> {
        self.read_band_resampled(index, self.grid.width, self.grid.height, ResampleMethod::Nearest)
    }

    /// Read the full extent of a band into a `width` x `height` buffer; GDAL
    /// RasterIO resamples with `method` when the sizes differ.
    pub fn read_band_resampled(
        &self,
        index: usize,
        width: usize,
        height: usize,
        method: ResampleMethod,
    ) -> Result<Array2<f64>, GdalError> {
        self.check_band(index)?;
        let band = self.dataset.rasterband(index)?;
        let window = (self.grid.width, self.grid.height);
        let buf = band.read_as::<f64>(
            (0, 0),       // offset
            window,       // window size
            (width, height),
            Some(resample_alg(method)),
        )?;
        to_array(buf.data().to_vec(), width, height)
    }

    /// Band 1 re-gridded to `width` x `height` without letting negative or
    /// no-data cells leak into valid ones. Nearest neighbour reads the band
    /// directly; other kernels run over an in-memory copy whose missing cells
    /// are `NaN`, so they come out `NaN` or as a blend of valid elevations.
    pub fn read_dem_resampled(
        &self,
        width: usize,
        height: usize,
        method: ResampleMethod,
    ) -> Result<Array2<f64>, GdalError> {
        if method == ResampleMethod::Nearest {
            return self.read_band_resampled(1, width, height, method);
        }
        let mut raster = self.read_raster()?;
        let masked = raster.mask_negative();
        let (rows, cols) = raster.shape();

        let driver = DriverManager::get_driver_by_name("MEM")?;
        let mem = driver.create_with_band_type::<f64, _>("", cols, rows, 1)?;
        let mut band = mem.rasterband(1)?;
        band.set_no_data_value(Some(f64::NAN))?;
        let mut buf = Buffer::new((cols, rows), raster.data.iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buf)?;

        debug!("Masked {} cell(s) before {} resampling", masked, method);
        let out = band.read_as::<f64>((0, 0), (cols, rows), (width, height), Some(resample_alg(method)))?;
        to_array(out.data().to_vec(), width, height)
    }

    /// Band 1 as a raster with this dataset's grid. Values are not masked.
    pub fn read_raster(&self) -> Result<Raster, GdalError> {
        let data = self.read_band(1)?;
        Ok(Raster::new(data, self.grid.clone()))
    }
}

fn to_array(data: Vec<f64>, width: usize, height: usize) -> Result<Array2<f64>, GdalError> {
    let got = data.len();
    Array2::from_shape_vec((height, width), data).map_err(|_| GdalError::DimensionMismatch(width, height, got))
}

/// Open `path`, read band 1 and map negative and no-data elevations to `NaN`.
pub fn load_dem<P: AsRef<Path>>(path: P) -> Result<Raster, GdalError> {
    let reader = DemReader::open(path.as_ref())?;
    let mut raster = reader.read_raster()?;
    let masked = raster.mask_negative();
    debug!("Masked {} no-data pixel(s) in {:?}", masked, path.as_ref());
    Ok(raster)
}
