use gdal::DriverManager;
use gdal::raster::Buffer;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::core::raster::Raster;
use crate::io::gdal::GdalError;
use crate::io::writers::metadata::embed_tiff_metadata;

/// No-data value written in place of `NaN` in derived rasters.
pub const NO_DATA: f64 = -9999.0;

/// Write a single-band Float64 GeoTIFF. `NaN` cells are stored as `no_data`,
/// which is also declared on the band. Georeferencing comes from the raster's
/// grid; `metadata` goes into the default domain.
pub fn write_raster_f64(
    output: &Path,
    raster: &Raster,
    no_data: Option<f64>,
    metadata: &BTreeMap<String, String>,
) -> Result<(), GdalError> {
    let (rows, cols) = raster.shape();
    let data: Vec<f64> = match no_data {
        Some(nd) => raster
            .data
            .iter()
            .map(|&v| if v.is_nan() { nd } else { v })
            .collect(),
        None => raster.data.iter().copied().collect(),
    };

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<f64, _>(output, cols, rows, 1)?;
    embed_tiff_metadata(&mut ds, &raster.grid, metadata)?;

    let mut band = ds.rasterband(1)?;
    if let Some(nd) = no_data {
        band.set_no_data_value(Some(nd))?;
    }
    let mut buf = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buf)?;

    debug!("Wrote {}x{} Float64 GeoTIFF {:?}", cols, rows, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gdal::DemReader;
    use crate::io::writers::metadata::provenance_fields;
    use ndarray::array;

    #[test]
    fn round_trips_georeferencing_and_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slope.tif");

        let mut raster = Raster::from_array(array![[1.5, f64::NAN], [3.0, 4.25]]);
        raster.grid.geotransform = [500_000.0, 2.0, 0.0, 4_000_000.0, 0.0, -2.0];
        write_raster_f64(&path, &raster, Some(NO_DATA), &provenance_fields("slope", None)).unwrap();

        let reader = DemReader::open(&path).unwrap();
        assert_eq!((reader.grid.width, reader.grid.height), (2, 2));
        assert_eq!(reader.grid.geotransform, raster.grid.geotransform);
        assert_eq!(reader.grid.no_data, Some(NO_DATA));
        assert_eq!(reader.metadata.get("PRODUCT").map(String::as_str), Some("slope"));

        let back = reader.read_band(1).unwrap();
        assert_eq!(back[[0, 0]], 1.5);
        assert_eq!(back[[0, 1]], NO_DATA);
        assert_eq!(back[[1, 1]], 4.25);
    }
}
