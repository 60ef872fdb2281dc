use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use demdelta::api::{self, BatchReport, RegionStatus, SummaryRow};
use demdelta::{PipelineLayout, PipelineParams};

use super::args::{CliArgs, Command, CommonArgs};
use super::errors::AppError;

fn init_logging(log: bool) {
    if log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }
}

fn layout_from(common: &CommonArgs) -> PipelineLayout {
    let mut layout = PipelineLayout::under(&common.work_dir);
    if let Some(dir) = &common.input_dir {
        layout.input_dir = dir.clone();
    }
    if let Some(dir) = &common.terrain_dir {
        layout.terrain_dir = dir.clone();
    }
    if let Some(dir) = &common.tables_dir {
        layout.tables_dir = dir.clone();
    }
    if let Some(dir) = &common.images_dir {
        layout.images_dir = dir.clone();
    }
    layout
}

fn params_from(common: &CommonArgs) -> Result<PipelineParams, AppError> {
    let mut params = match &common.config {
        Some(path) => PipelineParams::from_json_file(path)?,
        None => PipelineParams::default(),
    };
    if let Some(seed) = common.split_seed {
        params.split_seed = Some(seed);
    }
    if common.unseeded {
        params.split_seed = None;
    }
    if let Some(method) = common.resample_method {
        params.resample_method = method;
    }
    if let Some(policy) = common.outlier_policy {
        params.outlier_policy = policy;
    }
    if let Some(jobs) = common.jobs {
        if jobs == 0 {
            return Err(AppError::ZeroJobs { jobs });
        }
        rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global()?;
        params.parallel = true;
    }
    params.validate()?;
    Ok(params)
}

fn log_report(stage: &str, report: &BatchReport) -> usize {
    info!(
        "{}: processed {}, failed {}, skipped {}",
        stage, report.processed, report.errors, report.skipped
    );
    for failure in report.failures() {
        warn!("  {} [{}]: {}", failure.region, failure.stage, failure.message);
    }
    report.errors
}

fn log_summary(rows: &[SummaryRow], output: &Path) -> usize {
    let failed = rows.iter().filter(|r| r.status == RegionStatus::Failed).count();
    info!("Summary of {} region(s) written to {:?}", rows.len(), output);
    failed
}

fn ensure_dirs(layout: &PipelineLayout) -> Result<(), AppError> {
    for dir in [&layout.terrain_dir, &layout.tables_dir, &layout.images_dir] {
        std::fs::create_dir_all(dir).map_err(demdelta::Error::from)?;
    }
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.common.log);

    let layout = layout_from(&args.common);
    let params = params_from(&args.common)?;
    if !layout.input_dir.is_dir() {
        return Err(AppError::MissingArgument {
            arg: format!("--input-dir (not a directory: {:?})", layout.input_dir),
        }
        .into());
    }
    ensure_dirs(&layout)?;

    info!("Input directory: {:?}", layout.input_dir);
    let summary_path = layout.tables_dir.join(api::SUMMARY_TABLE);

    let failed = match args.command {
        Command::Resample => log_report("resample", &api::resample_directory(&layout, &params)?),
        Command::Terrain => log_report("terrain", &api::terrain_directory(&layout, &params)?),
        Command::Predict => log_report("predict", &api::predict_directory(&layout, &params)?),
        Command::Summarize => log_summary(&api::summarize_directory(&layout)?, &summary_path),
        Command::Plot => log_report("plot", &api::plot_directory(&layout, &params)?),
        Command::Cluster => log_report("cluster", &api::cluster_directory(&layout, &params)?),
        Command::Run => {
            let report = api::run_pipeline(&layout, &params)?;
            log_report("resample", &report.resample);
            log_report("terrain", &report.terrain);
            log_report("predict", &report.predict);
            log_report("plot", &report.plot);
            log_report("cluster", &report.cluster);
            log_summary(&report.summary, &summary_path)
        }
    };

    if failed > 0 {
        warn!("{} region(s) failed", failed);
        if args.common.strict {
            return Err(AppError::RegionsFailed { failed }.into());
        }
    } else {
        info!("All regions completed");
    }
    Ok(())
}
