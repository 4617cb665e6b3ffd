// ABOUTME: CLI config command: show the configuration the other commands would use

use anyhow::{Context, Result};
use std::path::Path;

use readygate::config::HarnessConfig;

use super::{ConfigArgs, OutputFormat};

/// Execute the config command
pub fn execute(
    args: ConfigArgs,
    config: &HarnessConfig,
    source: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "source": source.map(|p| p.display().to_string()),
                "config": config,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize config")?
            );
        }
        OutputFormat::Text => {
            match source {
                Some(path) => println!("# loaded from {}", path.display()),
                None => println!("# built-in defaults"),
            }
            print!(
                "{}",
                toml::to_string_pretty(config).context("Failed to serialize config")?
            );
        }
    }

    if let Some(path) = args.write {
        config.save(&path)?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}
