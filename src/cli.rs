// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobflow",
    version,
    about = "Generate multiple-choice questions from text documents.",
    long_about = None
)]
pub struct CliArgs {
    /// Plain-text documents; each one runs as its own job.
    #[arg(value_name = "FILE", required_unless_present = "dry_run")]
    pub files: Vec<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Jobflow.toml` is used when it exists and built-in
    /// defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `[questgen].num_questions`.
    #[arg(long, value_name = "N")]
    pub num_questions: Option<usize>,

    /// Override `[questgen].seed` for reproducible picks.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the effective configuration and exit without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
