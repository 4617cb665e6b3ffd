// ABOUTME: Behavioral tests for start/stop against a real subprocess
//
// Drives ServerLifecycle through ComposeCli with a shell stand-in for the
// orchestration CLI, so the log follower is an actual child process.

use super::fixtures::{process_alive, FakeCompose, LogEnd, CRASHING_LOG, MARKER, READY_LOG};
use crate::require_sh;
use anyhow::Result;
use pretty_assertions::assert_eq;
use readygate::config::ComposeConfig;
use readygate::{HarnessError, ServerLifecycle, TestSession};
use std::time::{Duration, Instant};

/// Ready on the third line; the follower is gone once start returns
#[tokio::test]
async fn test_start_ready_then_follower_terminated() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(READY_LOG, LogEnd::Hold)?;
    let mut server = ServerLifecycle::from_config(&fake.config(Duration::from_secs(30)));

    let report = server.start().await?;

    assert_eq!(report.lines_scanned, 3);
    assert_eq!(
        fake.calls(),
        vec!["up --detach".to_string(), "logs --no-color --follow".to_string()]
    );
    let pid = fake.follower_pid().expect("follower wrote its pid");
    assert!(!process_alive(pid), "log follower {pid} still running");
    Ok(())
}

/// The log closes before the marker: fails fast as StreamEndedEarly
#[tokio::test]
async fn test_start_fails_when_log_ends_early() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(CRASHING_LOG, LogEnd::Close)?;
    let mut server = ServerLifecycle::from_config(&fake.config(Duration::from_secs(5)));

    let started = Instant::now();
    let err = server.start().await.expect_err("start should fail");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(err.is_startup_failure());
    assert!(
        matches!(err, HarnessError::StreamEndedEarly { lines_scanned: 2, .. }),
        "unexpected error: {err:?}"
    );
    Ok(())
}

/// A log that goes quiet without the marker: StartupTimeout, follower killed
#[tokio::test]
async fn test_start_times_out_and_kills_follower() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(&["Starting..."], LogEnd::Hold)?;
    let mut server = ServerLifecycle::from_config(&fake.config(Duration::from_millis(300)));

    let err = server.start().await.expect_err("start should time out");

    match err {
        HarnessError::StartupTimeout {
            ref marker,
            timeout,
            lines_scanned,
        } => {
            assert_eq!(marker, MARKER);
            assert_eq!(timeout, Duration::from_millis(300));
            assert_eq!(lines_scanned, 1);
        }
        other => panic!("expected StartupTimeout, got {other:?}"),
    }
    let pid = fake.follower_pid().expect("follower wrote its pid");
    assert!(!process_alive(pid), "log follower {pid} still running");
    Ok(())
}

/// stop() without start() still issues `down` and never fails
#[tokio::test]
async fn test_stop_without_start() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(&[], LogEnd::Close)?;
    let mut server = ServerLifecycle::from_config(&fake.config(Duration::from_secs(1)));

    server.stop().await;
    server.stop().await;

    assert_eq!(fake.calls(), vec!["down".to_string(), "down".to_string()]);
    Ok(())
}

/// An orchestration program that is not installed is a spawn failure
#[tokio::test]
async fn test_missing_program_is_spawn_failure() -> Result<()> {
    let fake = FakeCompose::new(READY_LOG, LogEnd::Close)?;
    let mut config = fake.config(Duration::from_secs(1));
    config.compose = ComposeConfig {
        program: "readygate-missing-compose".to_string(),
        ..fake.compose_config()
    };
    let mut server = ServerLifecycle::from_config(&config);

    let err = server.start().await.expect_err("start should fail");
    assert!(matches!(err, HarnessError::SpawnFailed { .. }), "{err:?}");
    assert!(fake.calls().is_empty());

    // stop swallows the same failure
    server.stop().await;
    Ok(())
}

/// A session closes by tearing the server down
#[tokio::test]
async fn test_session_start_then_close() -> Result<()> {
    require_sh!();

    let fake = FakeCompose::new(READY_LOG, LogEnd::Hold)?;
    let mut session = TestSession::from_config(&fake.config(Duration::from_secs(30)));

    session.start_server().await?;
    assert!(session.is_started());
    session.close().await;

    assert_eq!(
        fake.calls(),
        vec![
            "up --detach".to_string(),
            "logs --no-color --follow".to_string(),
            "down".to_string()
        ]
    );
    Ok(())
}
