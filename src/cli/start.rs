// ABOUTME: CLI start command: bring the stack up and block until it is ready
//
// Exits successfully once the marker is seen and leaves the stack running.
// With --down-on-failure a failed start also tears the stack down.

use anyhow::{Context, Result};
use serde::Serialize;

use readygate::config::HarnessConfig;
use readygate::TestSession;

use super::{OutputFormat, Overrides, StartArgs};

/// JSON output structure for the start command
#[derive(Debug, Serialize)]
pub struct StartOutput {
    pub session_id: String,
    pub marker: String,
    pub lines_scanned: u64,
    pub time_to_ready_ms: u128,
}

/// Execute the start command
pub async fn execute(args: StartArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<()> {
    Overrides {
        marker: args.marker,
        timeout: args.timeout,
        deadline: args.deadline,
        project_dir: args.project_dir,
    }
    .apply(&mut config)?;

    let mut session = TestSession::from_config(&config);

    let report = match session.start_server().await {
        Ok(report) => report,
        Err(e) => {
            if args.down_on_failure {
                session.stop_server().await;
            }
            return Err(e).context("Server failed to start");
        }
    };

    match format {
        OutputFormat::Json => {
            let output = StartOutput {
                session_id: session.id().to_string(),
                marker: config.readiness.marker.clone(),
                lines_scanned: report.lines_scanned,
                time_to_ready_ms: report.time_to_ready.as_millis(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize start report")?
            );
        }
        OutputFormat::Text => {
            println!(
                "Server ready after {} lines in {:.1}s",
                report.lines_scanned,
                report.time_to_ready.as_secs_f64()
            );
        }
    }

    Ok(())
}
