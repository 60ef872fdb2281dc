//! Pair "before" and "after" DEMs in a directory by region key.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::region::{Region, RegionPair};
use crate::error::Result;

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// Region key of `path` when its stem ends with `suffix`, e.g.
/// `01_Area_Before.tif` with suffix `Before` gives `01_Area_`.
pub fn region_key(path: &Path, suffix: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let key = stem.strip_suffix(suffix)?;
    if key.is_empty() { None } else { Some(key.to_string()) }
}

/// List the GeoTIFFs in `dir`, pair them by region key and number the regions
/// 1.. in key order. A key with only one side present is kept with the other
/// side `None`.
pub fn discover_regions(dir: &Path, before_suffix: &str, after_suffix: &str) -> Result<Vec<RegionPair>> {
    discover_regions_indexed(dir, before_suffix, after_suffix, &[])
}

/// Like [`discover_regions`], but keys found under any of `index_suffixes`
/// also take a region number. Listings of one directory built with different
/// suffixes then agree on every index. A key seen only under an index suffix
/// yields a pair with both sides `None`.
pub fn discover_regions_indexed(
    dir: &Path,
    before_suffix: &str,
    after_suffix: &str,
    index_suffixes: &[&str],
) -> Result<Vec<RegionPair>> {
    let mut sides: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_tiff(p))
        .collect();
    entries.sort();

    for path in entries {
        if let Some(key) = region_key(&path, before_suffix) {
            sides.entry(key).or_default().0 = Some(path);
        } else if let Some(key) = region_key(&path, after_suffix) {
            sides.entry(key).or_default().1 = Some(path);
        } else if let Some(key) = index_suffixes.iter().find_map(|s| region_key(&path, s)) {
            sides.entry(key).or_default();
        } else {
            debug!("Skipping {:?}: no time-point suffix", path);
        }
    }

    let pairs: Vec<RegionPair> = sides
        .into_iter()
        .enumerate()
        .map(|(i, (key, (before, after)))| RegionPair {
            region: Region::new(i + 1, key),
            before,
            after,
        })
        .collect();

    for pair in pairs.iter().filter(|p| !p.is_complete()) {
        warn!("Region {} is missing a before or after raster", pair.region);
    }
    debug!("Discovered {} region(s) in {:?}", pairs.len(), dir);
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn key_strips_suffix() {
        assert_eq!(region_key(Path::new("a/01_Area_Before.tif"), "Before"), Some("01_Area_".into()));
        assert_eq!(region_key(Path::new("01_Area_After.tif"), "Before"), None);
        assert_eq!(region_key(Path::new("Before.tif"), "Before"), None);
    }

    #[test]
    fn pairs_sorted_by_key() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "03_Area_After.tif",
            "01_Area_Before.tif",
            "03_Area_Before.tif",
            "01_Area_After.TIF",
            "02_Area_Before.tiff",
            "notes.txt",
            "readme_Before.csv",
        ] {
            touch(dir.path(), name);
        }

        let pairs = discover_regions(dir.path(), "Before", "After").unwrap();
        let keys: Vec<(usize, &str)> = pairs
            .iter()
            .map(|p| (p.region.index, p.region.key.as_str()))
            .collect();
        assert_eq!(keys, vec![(1, "01_Area_"), (2, "02_Area_"), (3, "03_Area_")]);
        assert!(pairs[0].is_complete());
        assert!(!pairs[1].is_complete());
        assert!(pairs[1].after.is_none());
        assert!(pairs[2].is_complete());
    }

    #[test]
    fn resampled_rasters_use_their_own_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "01_Area_Before.tif");
        touch(dir.path(), "01_Area_Before_Resampled.tif");
        touch(dir.path(), "01_Area_After.tif");

        let pairs = discover_regions(dir.path(), "Before_Resampled", "After").unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            pairs[0].before.as_deref().and_then(|p| p.file_name()).and_then(|n| n.to_str()),
            Some("01_Area_Before_Resampled.tif")
        );
    }

    #[test]
    fn index_suffixes_keep_numbering_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "01_Area_Before.tif",
            "01_Area_Before_Resampled.tif",
            "01_Area_After.tif",
            "02_Area_Before.tif",
            "03_Area_Before.tif",
            "03_Area_Before_Resampled.tif",
            "03_Area_After.tif",
        ] {
            touch(dir.path(), name);
        }

        let raw = discover_regions_indexed(dir.path(), "Before", "After", &["Before_Resampled"]).unwrap();
        let resampled = discover_regions_indexed(dir.path(), "Before_Resampled", "After", &["Before"]).unwrap();
        let numbering = |pairs: &[RegionPair]| -> Vec<(usize, String)> {
            pairs.iter().map(|p| (p.region.index, p.region.key.clone())).collect()
        };
        assert_eq!(numbering(&raw), numbering(&resampled));
        assert_eq!(resampled.len(), 3);
        assert_eq!(resampled[2].region.error_table_name(), "03_Area_03_error.csv");
        assert!(resampled[1].before.is_none() && resampled[1].after.is_none());
        assert!(raw[1].before.is_some());

        // Plain discovery only numbers keys with a before or after side
        let plain = discover_regions(dir.path(), "Before_Resampled", "After").unwrap();
        assert_eq!(plain.len(), 2);
    }
}
