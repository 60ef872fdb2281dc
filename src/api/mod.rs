//! High-level library API: one entry point per pipeline stage, for a single
//! region or a whole directory, plus `run_pipeline` for the full chain.
//! Each stage reads the artifacts of the previous one from disk, so stages
//! can be rerun independently. A failing region is recorded in the
//! `BatchReport` and never stops the others.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::params::{AFTER_SUFFIX, BEFORE_SUFFIX, PipelineLayout, PipelineParams, RESAMPLED_SUFFIX};
use crate::core::processing::cluster::{SlopeClusterRecord, cluster_slope_difference};
use crate::core::processing::outliers::OutlierFilter;
use crate::core::processing::predict::{PredictionRecord, RegionPrediction, predict_elevation};
use crate::core::processing::resample::{AlignmentReport, target_grid, validate_alignment};
use crate::core::processing::sampling::sample_without_replacement;
use crate::core::processing::stats::ErrorStats;
use crate::core::processing::terrain;
use crate::core::raster::{GridInfo, Raster};
use crate::core::region::{Region, RegionPair};
use crate::error::{Error, Result};
use crate::io::discovery::discover_regions_indexed;
use crate::io::gdal::{DemReader, load_dem};
use crate::io::writers::metadata::provenance_fields;
use crate::io::writers::plot::{ChartLabels, ErrorPlot, LineChart, panel_letter, save_png};
use crate::io::writers::table::{read_records, write_records};
use crate::io::writers::tiff::{NO_DATA, write_raster_f64};
use crate::types::{ResampleMethod, Stage, TerrainAttribute};

/// File name of the per-region summary table.
pub const SUMMARY_TABLE: &str = "error_summary.csv";

/// Why a region dropped out of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFailure {
    pub region: Region,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    Completed(Region),
    Failed(RegionFailure),
}

impl RegionOutcome {
    pub fn region(&self) -> &Region {
        match self {
            RegionOutcome::Completed(region) => region,
            RegionOutcome::Failed(failure) => &failure.region,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RegionOutcome::Completed(_))
    }

    pub fn failure(&self) -> Option<&RegionFailure> {
        match self {
            RegionOutcome::Failed(failure) => Some(failure),
            RegionOutcome::Completed(_) => None,
        }
    }
}

/// Summary of a stage run over many regions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    /// Regions not attempted because an earlier stage failed for them
    pub skipped: usize,
    pub errors: usize,
    /// One entry per attempted region, sorted by region index
    pub outcomes: Vec<RegionOutcome>,
}

impl BatchReport {
    fn from_outcomes(mut outcomes: Vec<RegionOutcome>, skipped: usize) -> Self {
        outcomes.sort_by_key(|o| o.region().index);
        let processed = outcomes.iter().filter(|o| o.is_ok()).count();
        BatchReport {
            processed,
            skipped,
            errors: outcomes.len() - processed,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RegionFailure> {
        self.outcomes.iter().filter_map(RegionOutcome::failure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Ok,
    Failed,
}

/// One row of `error_summary.csv`. Statistic columns are empty unless the
/// region's error table was written, which a plot or cluster failure does not undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub region: usize,
    pub key: String,
    pub status: RegionStatus,
    pub failed_stage: Option<Stage>,
    pub message: Option<String>,
    pub land_percent_before: Option<f64>,
    pub land_percent_after: Option<f64>,
    pub count: Option<usize>,
    pub min_error: Option<f64>,
    pub max_error: Option<f64>,
    pub mean_error: Option<f64>,
    pub std_error: Option<f64>,
    pub p25_error: Option<f64>,
    pub p50_error: Option<f64>,
    pub p75_error: Option<f64>,
}

impl SummaryRow {
    pub fn ok(region: &Region, land: (Option<f64>, Option<f64>), stats: &ErrorStats) -> Self {
        SummaryRow {
            region: region.index,
            key: region.key.clone(),
            status: RegionStatus::Ok,
            failed_stage: None,
            message: None,
            land_percent_before: land.0,
            land_percent_after: land.1,
            count: None,
            min_error: None,
            max_error: None,
            mean_error: None,
            std_error: None,
            p25_error: None,
            p50_error: None,
            p75_error: None,
        }
        .with_stats(stats)
    }

    /// Fill the statistic columns, keeping status and failure fields.
    pub fn with_stats(mut self, stats: &ErrorStats) -> Self {
        self.count = Some(stats.count);
        self.min_error = Some(stats.min);
        self.max_error = Some(stats.max);
        self.mean_error = Some(stats.mean);
        self.std_error = Some(stats.std);
        self.p25_error = Some(stats.p25);
        self.p50_error = Some(stats.p50);
        self.p75_error = Some(stats.p75);
        self
    }

    pub fn failed(failure: &RegionFailure, land: (Option<f64>, Option<f64>)) -> Self {
        SummaryRow {
            region: failure.region.index,
            key: failure.region.key.clone(),
            status: RegionStatus::Failed,
            failed_stage: Some(failure.stage),
            message: Some(failure.message.clone()),
            land_percent_before: land.0,
            land_percent_after: land.1,
            count: None,
            min_error: None,
            max_error: None,
            mean_error: None,
            std_error: None,
            p25_error: None,
            p50_error: None,
            p75_error: None,
        }
    }
}

/// Reports of every stage of a full run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub resample: BatchReport,
    pub terrain: BatchReport,
    pub predict: BatchReport,
    pub plot: BatchReport,
    pub cluster: BatchReport,
    pub summary: Vec<SummaryRow>,
}

impl PipelineReport {
    /// Regions that failed at any stage, in stage order
    pub fn failures(&self) -> Vec<&RegionFailure> {
        [&self.resample, &self.terrain, &self.predict, &self.plot, &self.cluster]
            .into_iter()
            .flat_map(|r| r.failures())
            .collect()
    }
}

fn failure(region: &Region, stage: Stage, err: Error) -> RegionFailure {
    warn!("Region {:02} ({}) failed at {} stage: {}", region.index, region.key, stage, err);
    RegionFailure {
        region: region.clone(),
        stage,
        message: err.to_string(),
    }
}

/// Run `f` for every region not in `skip`, sequentially or on the rayon pool.
fn run_regions<F>(pairs: &[RegionPair], skip: &BTreeSet<usize>, stage: Stage, params: &PipelineParams, f: F) -> BatchReport
where
    F: Fn(&RegionPair) -> Result<()> + Sync,
{
    info!("Running {} stage over {} region(s)", stage, pairs.len());
    let run_one = |pair: &RegionPair| match f(pair) {
        Ok(()) => {
            info!("Region {:02} ({}): {} done", pair.region.index, pair.region.key, stage);
            RegionOutcome::Completed(pair.region.clone())
        }
        Err(e) => RegionOutcome::Failed(failure(&pair.region, stage, e)),
    };

    let todo: Vec<&RegionPair> = pairs.iter().filter(|p| !skip.contains(&p.region.index)).collect();
    let skipped = pairs.len() - todo.len();
    let outcomes: Vec<RegionOutcome> = if params.parallel {
        todo.par_iter().map(|p| run_one(*p)).collect()
    } else {
        todo.iter().map(|p| run_one(*p)).collect()
    };

    let report = BatchReport::from_outcomes(outcomes, skipped);
    info!(
        "{} stage: {} processed, {} failed, {} skipped",
        stage, report.processed, report.errors, report.skipped
    );
    report
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidArgument {
            arg: "path",
            value: path.display().to_string(),
        })
}

/// `<dir>/<stem>_Resampled.tif` for a "before" raster
pub fn resampled_path(before: &Path) -> Result<PathBuf> {
    let stem = file_stem(before)?;
    let parent = before.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{}{}.tif", stem, RESAMPLED_SUFFIX)))
}

/// `<terrain_dir>/<attribute>/<stem>_<attribute>.tif`
pub fn terrain_path(layout: &PipelineLayout, dem: &Path, attribute: TerrainAttribute) -> Result<PathBuf> {
    let stem = file_stem(dem)?;
    Ok(layout
        .terrain_dir
        .join(attribute.suffix())
        .join(format!("{}_{}.tif", stem, attribute.suffix())))
}

/// Stem suffix of re-gridded "before" rasters, e.g. `Before_Resampled`
pub fn resampled_before_suffix() -> String {
    format!("{}{}", BEFORE_SUFFIX, RESAMPLED_SUFFIX)
}

/// Regions of raw before/after rasters. Numbering covers every key in the
/// input directory, resampled or not, so it matches [`discover_resampled`].
pub fn discover_raw(layout: &PipelineLayout) -> Result<Vec<RegionPair>> {
    let resampled = resampled_before_suffix();
    discover_regions_indexed(&layout.input_dir, BEFORE_SUFFIX, AFTER_SUFFIX, &[resampled.as_str()])
}

/// Regions of re-gridded before rasters and their after rasters, numbered
/// like [`discover_raw`]. A region that was never resampled keeps its index
/// with the before side `None`.
pub fn discover_resampled(layout: &PipelineLayout) -> Result<Vec<RegionPair>> {
    discover_regions_indexed(&layout.input_dir, &resampled_before_suffix(), AFTER_SUFFIX, &[BEFORE_SUFFIX])
}

// ---------------------------------------------------------------- resample

/// Re-grid band 1 of `before` onto `after_grid`'s width and height with GDAL
/// RasterIO, keeping the extent of `before`, and write it as Float64 GeoTIFF.
/// Interpolating kernels never mix negative no-data into valid cells.
pub fn resample_to_match(before: &Path, after_grid: &GridInfo, method: ResampleMethod, output: &Path) -> Result<GridInfo> {
    let reader = DemReader::open(before)?;
    let data = reader.read_dem_resampled(after_grid.width, after_grid.height, method)?;
    let grid = target_grid(&reader.grid, after_grid);
    let raster = Raster::new(data, grid.clone());
    write_raster_f64(output, &raster, grid.no_data, &provenance_fields("resampled", Some(before)))?;
    info!(
        "Resampled {:?} {}x{} -> {}x{} ({})",
        before, reader.grid.width, reader.grid.height, grid.width, grid.height, method
    );
    Ok(grid)
}

/// Re-grid the before raster of `pair` onto its after raster and check the result.
pub fn resample_region(pair: &RegionPair, params: &PipelineParams) -> Result<AlignmentReport> {
    let before = pair.before_path()?;
    let after = pair.after_path()?;
    let after_grid = DemReader::open(after)?.grid;
    let output = resampled_path(before)?;
    resample_to_match(before, &after_grid, params.resample_method, &output)?;

    let written = DemReader::open(&output)?.grid;
    let report = validate_alignment(&written, &after_grid);
    report.ensure()?;
    Ok(report)
}

pub fn resample_directory(layout: &PipelineLayout, params: &PipelineParams) -> Result<BatchReport> {
    let pairs = discover_raw(layout)?;
    Ok(run_regions(&pairs, &BTreeSet::new(), Stage::Resample, params, |pair| {
        resample_region(pair, params).map(|_| ())
    }))
}

// ----------------------------------------------------------------- terrain

fn write_terrain(layout: &PipelineLayout, dem_path: &Path) -> Result<()> {
    let dem = load_dem(dem_path)?;
    for attribute in [TerrainAttribute::Slope, TerrainAttribute::Aspect] {
        let derived = terrain::derive(&dem, attribute);
        let output = terrain_path(layout, dem_path, attribute)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let fields = provenance_fields(attribute.suffix(), Some(dem_path));
        write_raster_f64(&output, &derived, Some(NO_DATA), &fields)?;
    }
    Ok(())
}

/// Slope and aspect rasters for both time points of a region.
pub fn terrain_region(pair: &RegionPair, layout: &PipelineLayout) -> Result<()> {
    write_terrain(layout, pair.before_path()?)?;
    write_terrain(layout, pair.after_path()?)
}

pub fn terrain_directory(layout: &PipelineLayout, params: &PipelineParams) -> Result<BatchReport> {
    let pairs = discover_resampled(layout)?;
    Ok(terrain_for(&pairs, &BTreeSet::new(), layout, params))
}

fn terrain_for(pairs: &[RegionPair], skip: &BTreeSet<usize>, layout: &PipelineLayout, params: &PipelineParams) -> BatchReport {
    run_regions(pairs, skip, Stage::TerrainAttribute, params, |pair| terrain_region(pair, layout))
}

// ----------------------------------------------------------------- predict

/// Fit and evaluate the per-pixel regressor for a region and persist its error table.
pub fn predict_region(pair: &RegionPair, layout: &PipelineLayout, params: &PipelineParams) -> Result<RegionPrediction> {
    let before = load_dem(pair.before_path()?)?;
    let after = load_dem(pair.after_path()?)?;
    let prediction = predict_elevation(before.data.view(), after.data.view(), params)?;
    let output = layout.tables_dir.join(pair.region.error_table_name());
    write_records(&output, &prediction.records)?;
    Ok(prediction)
}

pub fn predict_directory(layout: &PipelineLayout, params: &PipelineParams) -> Result<BatchReport> {
    let pairs = discover_resampled(layout)?;
    Ok(predict_for(&pairs, &BTreeSet::new(), layout, params))
}

fn predict_for(pairs: &[RegionPair], skip: &BTreeSet<usize>, layout: &PipelineLayout, params: &PipelineParams) -> BatchReport {
    run_regions(pairs, skip, Stage::Predict, params, |pair| {
        predict_region(pair, layout, params).map(|_| ())
    })
}

/// Signed errors of a region's persisted error table
pub fn load_errors(layout: &PipelineLayout, region: &Region) -> Result<Vec<f64>> {
    let path = layout.tables_dir.join(region.error_table_name());
    let records: Vec<PredictionRecord> = read_records(&path)?;
    if records.is_empty() {
        return Err(Error::EmptyErrorTable(path.display().to_string()));
    }
    Ok(records.into_iter().map(|r| r.error).collect())
}

// --------------------------------------------------------------- summarize

fn land_coverage(path: Option<&PathBuf>) -> Option<f64> {
    let path = path?;
    match load_dem(path) {
        Ok(raster) => Some(raster.land_coverage_percent()),
        Err(e) => {
            warn!("Land coverage unavailable for {:?}: {}", path, e);
            None
        }
    }
}

fn summarize_region(pair: &RegionPair, layout: &PipelineLayout, upstream: Option<&RegionFailure>) -> SummaryRow {
    let land = (land_coverage(pair.before.as_ref()), land_coverage(pair.after.as_ref()));
    // A table on disk from an earlier run must not stand in for a failed predict
    if let Some(failure) = upstream.filter(|f| f.stage <= Stage::Predict) {
        return SummaryRow::failed(failure, land);
    }
    let stats = pair
        .before_path()
        .and(pair.after_path())
        .and_then(|_| load_errors(layout, &pair.region))
        .and_then(|errors| ErrorStats::from_errors(&errors));
    match (stats, upstream) {
        (Ok(stats), None) => SummaryRow::ok(&pair.region, land, &stats),
        (Ok(stats), Some(later)) => SummaryRow::failed(later, land).with_stats(&stats),
        (Err(_), Some(later)) => SummaryRow::failed(later, land),
        (Err(e), None) => SummaryRow::failed(&failure(&pair.region, Stage::Aggregate, e), land),
    }
}

fn summarize_for(pairs: &[RegionPair], failures: &[&RegionFailure], layout: &PipelineLayout) -> Result<Vec<SummaryRow>> {
    let mut rows: Vec<SummaryRow> = pairs
        .iter()
        .map(|pair| {
            let upstream = failures.iter().copied().find(|f| f.region.index == pair.region.index);
            summarize_region(pair, layout, upstream)
        })
        .collect();
    rows.sort_by_key(|r| r.region);

    let output = layout.tables_dir.join(SUMMARY_TABLE);
    write_records(&output, &rows)?;
    info!("Wrote summary of {} region(s) to {:?}", rows.len(), output);
    Ok(rows)
}

/// One summary row per discovered region, written to `error_summary.csv`.
/// Regions without a readable error table are reported as failed.
pub fn summarize_directory(layout: &PipelineLayout) -> Result<Vec<SummaryRow>> {
    let pairs = discover_resampled(layout)?;
    summarize_for(&pairs, &[], layout)
}

// -------------------------------------------------------------------- plot

/// Render the four error figures of a region into `images_dir`.
pub fn plot_region(region: &Region, errors: &[f64], layout: &PipelineLayout, params: &PipelineParams) -> Result<()> {
    let filtered = OutlierFilter::from(params).apply(errors);
    for figure in ErrorPlot::ALL {
        let source: &[f64] = if figure.is_filtered() { &filtered } else { errors };
        let values = if figure.is_sampled() {
            sample_without_replacement(source, params.sample_size, params.plot_seed)
        } else {
            source.to_vec()
        };
        let path = layout.images_dir.join(region.plot_name(figure.suffix()));
        figure.chart().with_panel(panel_letter(region.index)).save(&values, &path)?;
    }
    Ok(())
}

pub fn plot_directory(layout: &PipelineLayout, params: &PipelineParams) -> Result<BatchReport> {
    let pairs = discover_resampled(layout)?;
    Ok(plot_for(&pairs, &BTreeSet::new(), layout, params))
}

fn plot_for(pairs: &[RegionPair], skip: &BTreeSet<usize>, layout: &PipelineLayout, params: &PipelineParams) -> BatchReport {
    run_regions(pairs, skip, Stage::Visualize, params, |pair| {
        let errors = load_errors(layout, &pair.region)?;
        plot_region(&pair.region, &errors, layout, params)
    })
}

// ----------------------------------------------------------------- cluster

/// Cluster the slope difference of a region, writing the labelled table and
/// a scatter chart coloured by cluster.
pub fn cluster_region(pair: &RegionPair, layout: &PipelineLayout, params: &PipelineParams) -> Result<Vec<SlopeClusterRecord>> {
    let before = load_dem(terrain_path(layout, pair.before_path()?, TerrainAttribute::Slope)?)?;
    let after = load_dem(terrain_path(layout, pair.after_path()?, TerrainAttribute::Slope)?)?;
    let records = cluster_slope_difference(before.data.view(), after.data.view(), params.cluster_count, params.cluster_seed)?;

    write_records(&layout.tables_dir.join(pair.region.cluster_table_name()), &records)?;

    let differences: Vec<f64> = records.iter().map(|r| r.difference).collect();
    let labels: Vec<usize> = records.iter().map(|r| r.cluster).collect();
    let limit = differences.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    let limit = if limit > 0.0 { limit } else { 1.0 };
    let chart = LineChart::new(-limit, limit)
        .with_labels(ChartLabels::new("Slope difference by cluster", "Pixel number", "Slope change (deg)"))
        .with_panel(panel_letter(pair.region.index));
    save_png(
        &chart.render_scatter(&differences, &labels),
        &layout.images_dir.join(pair.region.plot_name("E_Slope_Clusters")),
    )?;
    Ok(records)
}

pub fn cluster_directory(layout: &PipelineLayout, params: &PipelineParams) -> Result<BatchReport> {
    let pairs = discover_resampled(layout)?;
    Ok(cluster_for(&pairs, &BTreeSet::new(), layout, params))
}

fn cluster_for(pairs: &[RegionPair], skip: &BTreeSet<usize>, layout: &PipelineLayout, params: &PipelineParams) -> BatchReport {
    run_regions(pairs, skip, Stage::Cluster, params, |pair| {
        cluster_region(pair, layout, params).map(|_| ())
    })
}

// -------------------------------------------------------------------- full

fn mark_failed(skip: &mut BTreeSet<usize>, report: &BatchReport) {
    skip.extend(report.failures().map(|f| f.region.index));
}

/// Resample, derive terrain, predict, summarize, plot and cluster every
/// region under `layout`. A region that fails a stage is skipped by the
/// stages after it and reported as failed in the summary.
pub fn run_pipeline(layout: &PipelineLayout, params: &PipelineParams) -> Result<PipelineReport> {
    params.validate()?;
    for dir in [&layout.terrain_dir, &layout.tables_dir, &layout.images_dir] {
        std::fs::create_dir_all(dir)?;
    }

    let mut report = PipelineReport {
        resample: resample_directory(layout, params)?,
        ..PipelineReport::default()
    };
    let mut skip = BTreeSet::new();
    mark_failed(&mut skip, &report.resample);

    let pairs = discover_resampled(layout)?;

    report.terrain = terrain_for(&pairs, &skip, layout, params);
    mark_failed(&mut skip, &report.terrain);

    report.predict = predict_for(&pairs, &skip, layout, params);
    mark_failed(&mut skip, &report.predict);

    report.plot = plot_for(&pairs, &skip, layout, params);
    report.cluster = cluster_for(&pairs, &skip, layout, params);

    let failures = report.failures();
    let summary = summarize_for(&pairs, &failures, layout)?;
    report.summary = summary;

    info!(
        "Pipeline finished: {} region(s), {} failed",
        pairs.len(),
        report.summary.iter().filter(|r| r.status == RegionStatus::Failed).count()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::collections::BTreeMap;

    fn write_dem(path: &Path, data: Array2<f64>, pixel: f64) {
        let mut raster = Raster::from_array(data);
        raster.grid.geotransform = [500_000.0, pixel, 0.0, 4_100_000.0, 0.0, -pixel];
        write_raster_f64(path, &raster, None, &BTreeMap::new()).unwrap();
    }

    /// Hillside that drops 0.2 m everywhere between acquisitions
    fn write_region(dir: &Path, key: &str, before_scale: usize) {
        let (rows, cols) = (24usize, 30usize);
        let surface = |r: f64, c: f64| 1200.0 + r * 0.8 + (c * 0.3).sin() * 2.0;
        let before = Array2::from_shape_fn((rows / before_scale, cols / before_scale), |(r, c)| {
            surface((r * before_scale) as f64, (c * before_scale) as f64)
        });
        let after = Array2::from_shape_fn((rows, cols), |(r, c)| surface(r as f64, c as f64) - 0.2);
        write_dem(&dir.join(format!("{}Before.tif", key)), before, before_scale as f64);
        write_dem(&dir.join(format!("{}After.tif", key)), after, 1.0);
    }

    fn layout() -> (tempfile::TempDir, PipelineLayout) {
        let root = tempfile::tempdir().unwrap();
        let layout = PipelineLayout::under(root.path());
        std::fs::create_dir_all(&layout.input_dir).unwrap();
        (root, layout)
    }

    #[test]
    fn artifact_paths() {
        let before = Path::new("dems/01_Area_Before.tif");
        assert_eq!(
            resampled_path(before).unwrap(),
            PathBuf::from("dems/01_Area_Before_Resampled.tif")
        );
        let layout = PipelineLayout::under(Path::new("work"));
        assert_eq!(
            terrain_path(&layout, Path::new("x/01_Area_After.tif"), TerrainAttribute::Aspect).unwrap(),
            layout.terrain_dir.join("aspect").join("01_Area_After_aspect.tif")
        );
    }

    #[test]
    fn resample_aligns_before_onto_after() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);

        let report = resample_directory(&layout, &PipelineParams::default()).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errors, 0);

        let out = DemReader::open(layout.input_dir.join("01_Area_Before_Resampled.tif")).unwrap();
        let after = DemReader::open(layout.input_dir.join("01_Area_After.tif")).unwrap();
        assert!(validate_alignment(&out.grid, &after.grid).is_aligned());
    }

    #[test]
    fn missing_side_fails_only_that_region() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        write_dem(
            &layout.input_dir.join("02_Area_Before.tif"),
            Array2::from_elem((4, 4), 10.0),
            1.0,
        );

        let report = resample_directory(&layout, &PipelineParams::default()).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errors, 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.region.index, 2);
        assert_eq!(failure.stage, Stage::Resample);
    }

    #[test]
    fn full_pipeline_writes_every_artifact() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        write_region(&layout.input_dir, "02_Area_", 3);

        let report = run_pipeline(&layout, &PipelineParams::default()).unwrap();
        assert!(report.failures().is_empty(), "{:?}", report.failures());
        assert_eq!(report.summary.len(), 2);

        for region in [Region::new(1, "01_Area_"), Region::new(2, "02_Area_")] {
            assert!(layout.tables_dir.join(region.error_table_name()).exists());
            assert!(layout.tables_dir.join(region.cluster_table_name()).exists());
            for figure in ErrorPlot::ALL {
                assert!(layout.images_dir.join(region.plot_name(figure.suffix())).exists());
            }
            assert!(layout.images_dir.join(region.plot_name("E_Slope_Clusters")).exists());
        }
        assert!(layout.terrain_dir.join("slope").join("01_Area_Before_Resampled_slope.tif").exists());
        assert!(layout.terrain_dir.join("aspect").join("02_Area_After_aspect.tif").exists());

        let row = &report.summary[0];
        assert_eq!(row.status, RegionStatus::Ok);
        assert_eq!(row.land_percent_after, Some(100.0));
        assert!(row.count.unwrap() > 0);

        // Re-summarizing unchanged inputs gives identical rows
        let again = summarize_directory(&layout).unwrap();
        assert_eq!(again, report.summary);
        let from_disk: Vec<SummaryRow> = read_records(&layout.tables_dir.join(SUMMARY_TABLE)).unwrap();
        assert_eq!(from_disk.len(), 2);
    }

    #[test]
    fn all_missing_before_is_a_failed_region() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        write_dem(
            &layout.input_dir.join("02_Area_Before.tif"),
            Array2::from_elem((12, 15), -1.0),
            2.0,
        );
        write_dem(
            &layout.input_dir.join("02_Area_After.tif"),
            Array2::from_elem((24, 30), 50.0),
            1.0,
        );

        let report = run_pipeline(&layout, &PipelineParams::default()).unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].region.index, 2);
        assert_eq!(failures[0].stage, Stage::Predict);
        assert_eq!(report.plot.skipped, 1);

        let row = &report.summary[1];
        assert_eq!(row.status, RegionStatus::Failed);
        assert_eq!(row.failed_stage, Some(Stage::Predict));
        assert_eq!(row.land_percent_before, Some(0.0));
        assert!(row.count.is_none());
        assert_eq!(report.summary[0].status, RegionStatus::Ok);
    }

    #[test]
    fn parallel_run_matches_sequential() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        write_region(&layout.input_dir, "02_Area_", 2);
        write_region(&layout.input_dir, "03_Area_", 3);

        let sequential = run_pipeline(&layout, &PipelineParams::default()).unwrap();
        let params = PipelineParams {
            parallel: true,
            ..PipelineParams::default()
        };
        let parallel = run_pipeline(&layout, &params).unwrap();
        assert_eq!(sequential.summary, parallel.summary);
        let order: Vec<usize> = parallel.predict.outcomes.iter().map(|o| o.region().index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn standalone_stages_keep_run_numbering() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        write_dem(
            &layout.input_dir.join("02_Area_Before.tif"),
            Array2::from_elem((12, 15), 900.0),
            2.0,
        );
        write_region(&layout.input_dir, "03_Area_", 3);

        let report = run_pipeline(&layout, &PipelineParams::default()).unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!((failures[0].region.index, failures[0].stage), (2, Stage::Resample));
        assert!(layout.tables_dir.join("03_Area_03_error.csv").exists());

        let rows = summarize_directory(&layout).unwrap();
        let ids: Vec<(usize, &str, RegionStatus)> = rows.iter().map(|r| (r.region, r.key.as_str(), r.status)).collect();
        assert_eq!(
            ids,
            vec![
                (1, "01_Area_", RegionStatus::Ok),
                (2, "02_Area_", RegionStatus::Failed),
                (3, "03_Area_", RegionStatus::Ok),
            ]
        );
        assert!(rows[1].count.is_none());
        assert_eq!(rows[0], report.summary[0]);
        assert_eq!(rows[2], report.summary[2]);

        let predicted = predict_directory(&layout, &PipelineParams::default()).unwrap();
        let outcomes: Vec<(usize, bool)> = predicted.outcomes.iter().map(|o| (o.region().index, o.is_ok())).collect();
        assert_eq!(outcomes, vec![(1, true), (2, false), (3, true)]);
        assert!(!layout.tables_dir.join("02_Area_02_error.csv").exists());
    }

    #[test]
    fn interpolating_kernels_keep_negative_no_data_out() {
        let (_root, layout) = layout();
        let before = Array2::from_shape_fn((6, 6), |(_, c)| if c < 3 { 1200.0 } else { -1.0 });
        let before_path = layout.input_dir.join("01_Area_Before.tif");
        write_dem(&before_path, before, 2.0);
        let after_grid = GridInfo::new(12, 12);

        assert_eq!(PipelineParams::default().resample_method, ResampleMethod::Nearest);
        for method in [ResampleMethod::Nearest, ResampleMethod::Bilinear] {
            let output = layout.input_dir.join(format!("{}_Resampled.tif", method));
            resample_to_match(&before_path, &after_grid, method, &output).unwrap();

            let dem = load_dem(&output).unwrap();
            let valid: Vec<f64> = dem.data.iter().copied().filter(|v| !v.is_nan()).collect();
            assert!(!valid.is_empty(), "{}", method);
            assert!(valid.len() < dem.data.len(), "{}", method);
            for v in valid {
                assert!((v - 1200.0).abs() < 1e-6, "{} produced {}", method, v);
            }
        }
    }

    #[test]
    fn late_stage_failure_keeps_prediction_stats() {
        let (_root, layout) = layout();
        write_region(&layout.input_dir, "01_Area_", 2);
        // Too small for a 3x3 slope window: predicts, then fails to cluster
        let tiny = |offset: f64| Array2::from_shape_fn((2, 2), |(r, c)| 100.0 + r as f64 + c as f64 * 2.0 + offset);
        write_dem(&layout.input_dir.join("02_Area_Before.tif"), tiny(0.0), 1.0);
        write_dem(&layout.input_dir.join("02_Area_After.tif"), tiny(-0.1), 1.0);

        let report = run_pipeline(&layout, &PipelineParams::default()).unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!((failures[0].region.index, failures[0].stage), (2, Stage::Cluster));

        let row = &report.summary[1];
        assert_eq!(row.status, RegionStatus::Failed);
        assert_eq!(row.failed_stage, Some(Stage::Cluster));
        assert_eq!(row.count, Some(2));
        assert!(row.mean_error.is_some());
        assert_eq!(report.summary[0].status, RegionStatus::Ok);
    }
}
