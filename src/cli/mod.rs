// ABOUTME: CLI argument parsing and command routing for readygate
//
// Provides command-line interface for:
// - Bringing the stack up and blocking until it is ready (start)
// - Tearing the stack down (stop)
// - Scanning an already running log stream on stdin (wait)
// - Showing the effective configuration (config)

pub mod config;
pub mod start;
pub mod stop;
pub mod wait;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use readygate::config::HarnessConfig;

/// Start an orchestrated server and wait until its log says it is ready
#[derive(Parser)]
#[command(name = "readygate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Read this config file instead of searching the default locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Output format for commands
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Bring the stack up and block until the readiness marker appears
    Start(StartArgs),

    /// Tear the stack down
    Stop(StopArgs),

    /// Scan stdin until the readiness marker appears
    Wait(WaitArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the start command
#[derive(clap::Args)]
pub struct StartArgs {
    /// Substring that marks the server as ready
    #[arg(long, short)]
    pub marker: Option<String>,

    /// Seconds to wait for each log line
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Seconds to wait for the marker overall
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Directory containing the compose project
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Run `down` when the server fails to become ready
    #[arg(long)]
    pub down_on_failure: bool,
}

/// Arguments for the stop command
#[derive(clap::Args)]
pub struct StopArgs {
    /// Directory containing the compose project
    #[arg(long)]
    pub project_dir: Option<PathBuf>,
}

/// Arguments for the wait command
#[derive(clap::Args)]
pub struct WaitArgs {
    /// Substring that marks the server as ready
    #[arg(long, short)]
    pub marker: Option<String>,

    /// Seconds to wait for each line
    #[arg(long, short)]
    pub timeout: Option<u64>,

    /// Seconds to wait for the marker overall
    #[arg(long)]
    pub deadline: Option<u64>,
}

/// Arguments for the config command
#[derive(clap::Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to this file as well
    #[arg(long)]
    pub write: Option<PathBuf>,
}

/// Command-line values that take precedence over files and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub marker: Option<String>,
    pub timeout: Option<u64>,
    pub deadline: Option<u64>,
    pub project_dir: Option<PathBuf>,
}

impl Overrides {
    /// Apply on top of a loaded configuration and re-validate
    pub fn apply(self, config: &mut HarnessConfig) -> Result<()> {
        if let Some(marker) = self.marker {
            config.readiness.marker = marker;
        }
        if let Some(secs) = self.timeout {
            config.readiness.startup_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.deadline {
            config.readiness.deadline = Some(Duration::from_secs(secs));
        }
        if let Some(dir) = self.project_dir {
            config.compose.project_dir = dir;
        }
        config.validate()
    }
}
