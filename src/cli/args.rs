use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use demdelta::{OutlierPolicy, ResampleMethod};

#[derive(Parser)]
#[command(name = "demdelta", version, about = "Before/after DEM change analysis")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Re-grid every "before" DEM onto its "after" DEM and validate alignment
    Resample,
    /// Write slope and aspect rasters for both time points
    Terrain,
    /// Fit the per-pixel regressor and write per-region error tables
    Predict,
    /// Aggregate error tables into error_summary.csv
    Summarize,
    /// Render the error line charts
    Plot,
    /// Cluster slope differences with k-means
    Cluster,
    /// Run every stage in order
    Run,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Working directory with rasters/, terrain/, tables/ and images/
    #[arg(short, long, global = true, default_value = ".")]
    pub work_dir: PathBuf,

    /// Directory of the input DEMs (default: <work-dir>/rasters)
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Root of the slope/ and aspect/ outputs (default: <work-dir>/terrain)
    #[arg(long, global = true)]
    pub terrain_dir: Option<PathBuf>,

    /// Directory of CSV tables (default: <work-dir>/tables)
    #[arg(long, global = true)]
    pub tables_dir: Option<PathBuf>,

    /// Directory of PNG charts (default: <work-dir>/images)
    #[arg(long, global = true)]
    pub images_dir: Option<PathBuf>,

    /// JSON file with pipeline parameters; flags below override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed of the train/evaluation split
    #[arg(long, global = true)]
    pub split_seed: Option<u64>,

    /// Draw the train/evaluation split from OS entropy (not reproducible)
    #[arg(long, global = true, default_value_t = false, conflicts_with = "split_seed")]
    pub unseeded: bool,

    /// Resampling kernel for the resample stage
    #[arg(long, global = true, value_enum)]
    pub resample_method: Option<ResampleMethod>,

    /// Outlier rule for the filtered charts
    #[arg(long, global = true, value_enum)]
    pub outlier_policy: Option<OutlierPolicy>,

    /// Process regions in parallel with this many threads
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Exit with an error status when any region fails
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Enable logging
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,
}
