//! Command Line Interface (CLI) layer for demdelta.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that maps each subcommand to a
//! pipeline stage of `demdelta::api`.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
