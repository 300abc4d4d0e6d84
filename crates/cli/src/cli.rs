//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// physio-merge - align physiological recordings onto one time grid
#[derive(Parser, Debug)]
#[command(
    name = "physio-merge",
    author,
    version,
    about = "Merge per-stream physiological CSV recordings",
    long_about = "Merges the per-stream CSV recordings of each participant into one table.\n\n\
                  Discovers inputs by file name, sorts them chronologically, aligns every \n\
                  stream onto a common output frequency and writes MERGED and DEBUG tables."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PHYSIO_MERGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PHYSIO_MERGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge every participant found in the input directory
    Run(RunArgs),

    /// Validate configuration file without merging
    Validate(ValidateArgs),

    /// Display the effective stream catalog
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when absent
    #[arg(short, long, env = "PHYSIO_MERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the input directory
    #[arg(short, long, env = "PHYSIO_MERGE_INPUT")]
    pub input: Option<PathBuf>,

    /// Override the output directory (defaults to the input directory)
    #[arg(short, long, env = "PHYSIO_MERGE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override the output frequency in Hz
    #[arg(long, env = "PHYSIO_MERGE_TARGET_HZ")]
    pub target_hz: Option<u32>,

    /// Participants merged concurrently
    #[arg(short, long, env = "PHYSIO_MERGE_JOBS")]
    pub jobs: Option<usize>,

    /// Per-participant timeout in seconds (0 = no timeout)
    #[arg(long, env = "PHYSIO_MERGE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Only accept samples that land exactly on the current instant
    #[arg(long)]
    pub coincident: bool,

    /// Fail when a declared data column is missing
    #[arg(long)]
    pub strict_columns: bool,

    /// Do not presort inputs (they must already be chronological)
    #[arg(long)]
    pub no_sort: bool,

    /// Merge without writing output tables
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, default_value = "0", env = "PHYSIO_MERGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "physio-merge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when absent
    #[arg(short, long, env = "PHYSIO_MERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
