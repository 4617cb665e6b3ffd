// ABOUTME: CLI wait command: scan stdin for the readiness marker
//
// For stacks started some other way:
//   docker logs -f graylog | readygate wait --marker "Graylog server up and running."

use anyhow::{bail, Context, Result};
use serde::Serialize;

use readygate::config::HarnessConfig;
use readygate::readiness::{ReadinessOutcome, ReadinessPipeline, TracingObserver};

use super::{OutputFormat, Overrides, WaitArgs};

/// JSON output structure for the wait command
#[derive(Debug, Serialize)]
pub struct WaitOutput {
    pub ready: bool,
    pub lines_scanned: u64,
    pub stream_closed: bool,
    pub elapsed_ms: u128,
}

/// Execute the wait command
pub async fn execute(args: WaitArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<()> {
    Overrides {
        marker: args.marker,
        timeout: args.timeout,
        deadline: args.deadline,
        project_dir: None,
    }
    .apply(&mut config)?;

    let readiness = &config.readiness;
    let mut pipeline =
        ReadinessPipeline::spawn(tokio::io::stdin(), TracingObserver, readiness.deadline);
    let outcome = pipeline
        .wait_until_ready(&readiness.marker, readiness.startup_timeout)
        .await;

    let scanner = pipeline.scanner();
    let output = WaitOutput {
        ready: outcome.is_ready(),
        lines_scanned: scanner.lines_scanned(),
        stream_closed: scanner.stream_closed(),
        elapsed_ms: scanner.elapsed().as_millis(),
    };
    pipeline.shutdown(readiness.reader_join_grace).await;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize wait result")?
        ),
        OutputFormat::Text if output.ready => {
            println!("Ready after {} lines", output.lines_scanned);
        }
        OutputFormat::Text => {}
    }

    match outcome {
        ReadinessOutcome::Ready => Ok(()),
        ReadinessOutcome::TimedOut if output.stream_closed => bail!(
            "input ended after {} lines without {:?}",
            output.lines_scanned,
            readiness.marker
        ),
        ReadinessOutcome::TimedOut => bail!(
            "no line containing {:?} within {:?}",
            readiness.marker,
            readiness.startup_timeout
        ),
    }
}
