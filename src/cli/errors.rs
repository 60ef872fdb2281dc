use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("--jobs must be greater than 0, got: {jobs}")]
    ZeroJobs { jobs: usize },

    #[error("{failed} region(s) failed; see the log or error_summary.csv")]
    RegionsFailed { failed: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Pipeline(#[from] demdelta::Error),
}
