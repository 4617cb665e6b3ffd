// ABOUTME: CLI stop command: tear the stack down, best effort

use anyhow::Result;

use readygate::config::HarnessConfig;
use readygate::ServerLifecycle;

use super::{OutputFormat, Overrides, StopArgs};

/// Execute the stop command
///
/// Teardown failures are logged by the lifecycle and never fail the command.
pub async fn execute(args: StopArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<()> {
    Overrides {
        project_dir: args.project_dir,
        ..Overrides::default()
    }
    .apply(&mut config)?;

    ServerLifecycle::from_config(&config).stop().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "stopped": true })),
        OutputFormat::Text => println!("Server stopped"),
    }

    Ok(())
}
