//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tfvis - live transform flow visualization
#[derive(Parser, Debug)]
#[command(
    name = "tfvis",
    author,
    version,
    about = "Live transform flow visualization",
    long_about = "Captures frames, runs transform flow analysis on them and presents\n\
                  every frame with its flow annotation overlaid, strictly in capture order."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TFVIS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "TFVIS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the visualization loop
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "visualize.toml",
        env = "TFVIS_CONFIG",
        conflicts_with = "synthetic"
    )]
    pub config: PathBuf,

    /// Run the built-in synthetic source and analysis, no config file
    #[arg(long)]
    pub synthetic: bool,

    /// Override max_wait_ticks
    #[arg(long, env = "TFVIS_MAX_WAIT_TICKS")]
    pub max_wait_ticks: Option<u64>,

    /// Override window_capacity
    #[arg(long, env = "TFVIS_WINDOW_CAPACITY")]
    pub window_capacity: Option<usize>,

    /// Override the tick interval in milliseconds
    #[arg(long, env = "TFVIS_TICK_INTERVAL_MS")]
    pub tick_interval_ms: Option<u64>,

    /// Stop after this many ticks (0 = unlimited)
    #[arg(long, env = "TFVIS_MAX_TICKS")]
    pub max_ticks: Option<u64>,

    /// Stop pulling after this many frames (0 = unlimited)
    #[arg(long, env = "TFVIS_MAX_FRAMES")]
    pub max_frames: Option<u64>,

    /// Write presented frames as PNG into this directory
    #[arg(long, env = "TFVIS_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "TFVIS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "visualize.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "visualize.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration with all defaults filled in (TOML)
    #[arg(long, conflicts_with = "json")]
    pub effective: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "tfvis",
            "-v",
            "run",
            "--synthetic",
            "--max-ticks",
            "50",
            "--window-capacity",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.synthetic);
        assert_eq!(args.max_ticks, Some(50));
        assert_eq!(args.window_capacity, Some(4));
        assert_eq!(args.max_wait_ticks, None);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["tfvis", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_flags() {
        let cli =
            Cli::try_parse_from(["tfvis", "info", "--config", "a.json", "--effective"]).unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert_eq!(args.config, PathBuf::from("a.json"));
        assert!(args.effective);
    }
}
