// ABOUTME: Error taxonomy for server startup and readiness detection
//
// Startup failures (timeout, stream closed early, spawn failure) surface
// synchronously from ServerLifecycle::start and are never retried.

use std::time::Duration;

use thiserror::Error;

use crate::process::supervisor::SupervisorError;

/// Errors surfaced by the server lifecycle
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The readiness marker was not seen before a dequeue attempt timed out
    #[error(
        "Server did not become ready: no line containing {marker:?} within {timeout:?} ({lines_scanned} lines scanned)"
    )]
    StartupTimeout {
        /// Marker that was being waited for
        marker: String,
        /// Per-attempt timeout that elapsed
        timeout: Duration,
        /// Lines inspected before giving up
        lines_scanned: u64,
    },

    /// The log stream closed before the readiness marker appeared
    #[error(
        "Server did not become ready: log stream ended after {lines_scanned} lines without {marker:?}"
    )]
    StreamEndedEarly {
        /// Marker that was being waited for
        marker: String,
        /// Lines inspected before the stream closed
        lines_scanned: u64,
    },

    /// An orchestration command or the log follower could not be launched
    #[error("Failed to launch `{command}`: {source}")]
    SpawnFailed {
        /// Command line that failed to launch
        command: String,
        /// Underlying launch error
        #[source]
        source: std::io::Error,
    },

    /// Process supervision failed
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl HarnessError {
    /// Build a spawn failure for a command line
    pub fn spawn_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            command: command.into(),
            source,
        }
    }

    /// True for the two "server never became ready" failures
    #[must_use]
    pub const fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::StartupTimeout { .. } | Self::StreamEndedEarly { .. }
        )
    }
}

/// Result alias for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
