// ABOUTME: Behavioral tests for configuration files feeding the server lifecycle
// Verifies explicit config files, defaults for omitted fields and validation

use super::fixtures::{FakeCompose, LogEnd, READY_LOG};
use crate::require_sh;
use anyhow::Result;
use readygate::config::{HarnessConfig, DEFAULT_MARKER};
use readygate::ServerLifecycle;
use std::time::Duration;

/// An explicit config file replaces the search and keeps defaults for the rest
#[test]
fn test_explicit_file_with_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("readygate.toml");
    std::fs::write(
        &path,
        r#"
        [compose]
        project_dir = "/srv/graylog"
        project_name = "graylog-it"
        "#,
    )?;

    let config = HarnessConfig::load_from_path(&path)?;

    assert_eq!(config.compose.program, "docker");
    assert_eq!(config.compose.project_name.as_deref(), Some("graylog-it"));
    assert_eq!(config.readiness.marker, DEFAULT_MARKER);
    Ok(())
}

/// An empty marker would match every line, so loading rejects it
#[test]
fn test_empty_marker_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("readygate.toml");
    std::fs::write(&path, "[readiness]\nmarker = \"\"\n")?;

    let err = HarnessConfig::load_with(Some(&path)).expect_err("empty marker accepted");
    assert!(format!("{err:#}").contains("marker"), "{err:#}");
    Ok(())
}

/// Malformed TOML names the offending file
#[test]
fn test_malformed_file_reports_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[readiness\nmarker = 1")?;

    let err = HarnessConfig::load_from_path(&path).expect_err("broken file parsed");
    assert!(err.to_string().contains("broken.toml"));
    Ok(())
}

/// A saved config drives a real start end to end
#[tokio::test]
async fn test_saved_config_drives_start() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(READY_LOG, LogEnd::Hold)?;
    let path = fake.path().join(".readygate").join("config.toml");
    fake.config(Duration::from_secs(30)).save(&path)?;

    let config = HarnessConfig::load_from_path(&path)?;
    let report = ServerLifecycle::from_config(&config).start().await?;

    assert_eq!(report.lines_scanned, 3);
    Ok(())
}
