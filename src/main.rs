// ABOUTME: Main entry point for the readygate CLI
//
// Binary: readygate
// Usage: readygate <COMMAND>
// - start: bring the stack up and block until it is ready
// - stop: tear the stack down
// - wait: scan stdin for the readiness marker
// - config: print the effective configuration

#![allow(missing_docs)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use readygate::config::HarnessConfig;

mod cli;

fn main() -> ExitCode {
    let args = cli::Cli::parse();

    setup_logging();
    setup_panic_handler();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args));

    // `wait` may leave a blocking stdin read behind; don't join it
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> Result<()> {
    let source = match args.config {
        Some(ref path) => Some(path.clone()),
        None => HarnessConfig::locate(),
    };
    let config = HarnessConfig::load_with(args.config.as_deref())
        .context("Failed to load configuration")?;

    match args.command {
        cli::Commands::Start(start_args) => cli::start::execute(start_args, config, args.format).await,
        cli::Commands::Stop(stop_args) => cli::stop::execute(stop_args, config, args.format).await,
        cli::Commands::Wait(wait_args) => cli::wait::execute(wait_args, config, args.format).await,
        cli::Commands::Config(config_args) => {
            cli::config::execute(config_args, &config, source.as_deref(), args.format)
        }
    }
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use tracing_subscriber::prelude::*;

    // Create log directory if it doesn't exist
    let log_dir = dirs::home_dir()
        .map(|home| home.join(".readygate").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".readygate/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    // Create JSONL log file with timestamp
    let log_file = log_dir.join(format!(
        "readygate-{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // A read-only home still gets stderr logging
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .json() // Output in JSON Lines format
                .with_target(true) // Include target module in JSON
                .with_writer(file)
                .with_ansi(false)
        });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readygate=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs in ~/.readygate/logs for more details.");
    }));
}
