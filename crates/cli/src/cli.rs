//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sensor Fusion - visual/inertial synchronization and tracking pipeline
#[derive(Parser, Debug)]
#[command(
    name = "sensor-fusion",
    author,
    version,
    about = "Visual/inertial sensor fusion pipeline",
    long_about = "A sensor synchronization and tracking front end.\n\n\
                  Synchronizes multi-camera image streams, sequences them with \n\
                  inertial data, drives a tracking engine and derives pose, \n\
                  velocity and covariance estimates."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_FUSION_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSOR_FUSION_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fusion pipeline against simulated sensors
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
        default_value = "config.toml",
        env = "SENSOR_FUSION_CONFIG"
    )]
    pub config: PathBuf,

    /// Run duration in seconds (0 = until interrupted)
    #[arg(long, default_value = "0", env = "SENSOR_FUSION_DURATION")]
    pub duration: u64,

    /// Simulated camera frame rate (Hz)
    #[arg(long, default_value = "30.0", env = "SENSOR_FUSION_FRAME_RATE")]
    pub frame_rate: f64,

    /// Simulated inertial sample rate (Hz)
    #[arg(long, default_value = "200.0", env = "SENSOR_FUSION_IMU_RATE")]
    pub imu_rate: f64,

    /// Save the map to this folder before shutting down
    #[arg(long)]
    pub save_map: Option<PathBuf>,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "SENSOR_FUSION_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed camera information
    #[arg(long)]
    pub cameras: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
