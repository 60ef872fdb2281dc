use gdal::Dataset;
use gdal::Metadata;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::raster::GridInfo;
use crate::io::gdal::GdalError;

/// Provenance entries written into every GeoTIFF the pipeline produces
pub fn provenance_fields(product: &str, source: Option<&Path>) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("PRODUCT".to_string(), product.to_string());
    if let Some(src) = source {
        metadata.insert("SOURCE".to_string(), src.display().to_string());
    }
    metadata.insert("PROCESSING_TOOL".to_string(), env!("CARGO_PKG_NAME").to_string());
    metadata.insert(
        "PROCESSING_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    metadata.insert(
        "PROCESSING_TIMESTAMP".to_string(),
        chrono::Utc::now().to_rfc3339(),
    );
    metadata
}

fn is_identity(gt: [f64; 6]) -> bool {
    gt[0] == 0.0 && gt[1] == 1.0 && gt[2] == 0.0 && gt[3] == 0.0 && gt[4] == 0.0 && gt[5] == 1.0
}

/// Set georeferencing and metadata items on a GeoTIFF dataset.
/// An identity geotransform is treated as "not georeferenced" and skipped,
/// together with the projection.
pub fn embed_tiff_metadata(
    ds: &mut Dataset,
    grid: &GridInfo,
    metadata: &BTreeMap<String, String>,
) -> Result<(), GdalError> {
    if !is_identity(grid.geotransform) {
        ds.set_geo_transform(&grid.geotransform)?;
        if !grid.projection.is_empty() {
            ds.set_projection(&grid.projection)?;
        }
    }
    for (key, value) in metadata {
        ds.set_metadata_item(key, value, "")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_names_product_and_source() {
        let fields = provenance_fields("slope", Some(Path::new("dem/01_Area_After.tif")));
        assert_eq!(fields.get("PRODUCT").map(String::as_str), Some("slope"));
        assert_eq!(
            fields.get("SOURCE").map(String::as_str),
            Some("dem/01_Area_After.tif")
        );
        assert!(fields.contains_key("PROCESSING_TIMESTAMP"));
        assert!(!provenance_fields("x", None).contains_key("SOURCE"));
    }

    #[test]
    fn identity_transform_detected() {
        assert!(is_identity([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]));
        assert!(!is_identity([10.0, 1.0, 0.0, 0.0, 0.0, -1.0]));
    }
}
