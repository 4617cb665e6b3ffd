// ABOUTME: Server lifecycle: bring the stack up, block until its log shows readiness, tear down
//
// start() always terminates the log follower and joins the line reader before
// it returns, whatever the outcome. stop() is best effort and never fails.

use std::fmt;
use std::io;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::compose::{ComposeBackend, ComposeCli};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::process::LogFollower;
use crate::readiness::{
    BoxedObserver, LineObserver, LogLine, ReadinessOutcome, ReadinessPipeline, TracingObserver,
};

/// What a successful start observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartReport {
    /// Lines read up to and including the marker line
    pub lines_scanned: u64,
    /// Time from the first wait until the marker line
    pub time_to_ready: Duration,
}

/// Logs every line and forwards it to the caller's observer, if any
struct LifecycleObserver<'a>(Option<&'a mut BoxedObserver>);

impl LineObserver for LifecycleObserver<'_> {
    fn observe(&mut self, line: &LogLine) {
        TracingObserver.observe(line);
        if let Some(observer) = self.0.as_deref_mut() {
            observer(line);
        }
    }
}

/// Starts and stops one orchestrated server
pub struct ServerLifecycle<B = ComposeCli> {
    backend: B,
    marker: String,
    startup_timeout: Duration,
    deadline: Option<Duration>,
    reader_join_grace: Duration,
    observer: Option<BoxedObserver>,
}

impl ServerLifecycle<ComposeCli> {
    /// Lifecycle driving the configured compose CLI
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            ComposeCli::from_config(config),
            config.readiness.marker.clone(),
            config.readiness.startup_timeout,
        )
        .with_deadline(config.readiness.deadline)
        .with_reader_join_grace(config.readiness.reader_join_grace)
    }
}

impl<B: ComposeBackend> ServerLifecycle<B> {
    pub fn new(backend: B, marker: impl Into<String>, startup_timeout: Duration) -> Self {
        Self {
            backend,
            marker: marker.into(),
            startup_timeout,
            deadline: None,
            reader_join_grace: Duration::from_secs(2),
            observer: None,
        }
    }

    /// Cap the whole scan in addition to the per-line timeout
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// How long teardown waits for the reader before aborting it
    #[must_use]
    pub fn with_reader_join_grace(mut self, grace: Duration) -> Self {
        self.reader_join_grace = grace;
        self
    }

    /// Receive every scanned line on later starts
    pub fn set_observer(&mut self, observer: BoxedObserver) {
        self.observer = Some(observer);
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Bring the server up and block until its log shows the marker
    ///
    /// # Errors
    /// - `SpawnFailed` if `up` or the log follower cannot be launched
    /// - `StreamEndedEarly` if the log closed before the marker
    /// - `StartupTimeout` if a wait for the next line timed out
    pub async fn start(&mut self) -> HarnessResult<StartReport> {
        info!(marker = %self.marker, timeout = ?self.startup_timeout, "Starting server");

        self.backend.up().await?;
        let mut follower = self.backend.follow_logs()?;

        let Some(stream) = follower.take_output() else {
            terminate_follower(&mut follower).await;
            return Err(HarnessError::spawn_failed(
                "log follower",
                io::Error::new(io::ErrorKind::BrokenPipe, "no output stream to read"),
            ));
        };

        let mut pipeline = ReadinessPipeline::spawn(
            stream,
            LifecycleObserver(self.observer.as_mut()),
            self.deadline,
        );
        let outcome = pipeline
            .wait_until_ready(&self.marker, self.startup_timeout)
            .await;

        let scanner = pipeline.scanner();
        let lines_scanned = scanner.lines_scanned();
        let stream_closed = scanner.stream_closed();
        let elapsed = scanner.elapsed();

        // Teardown runs on every outcome: the follower first so its pipe
        // closes and the reader can finish on its own
        terminate_follower(&mut follower).await;
        let reader_state = pipeline.shutdown(self.reader_join_grace).await;
        debug!(state = ?reader_state, "Line reader joined");

        match outcome {
            ReadinessOutcome::Ready => {
                info!(lines = lines_scanned, elapsed = ?elapsed, "Server is ready");
                Ok(StartReport {
                    lines_scanned,
                    time_to_ready: elapsed,
                })
            }
            ReadinessOutcome::TimedOut if stream_closed => {
                error!(lines = lines_scanned, "Server log ended before readiness");
                Err(HarnessError::StreamEndedEarly {
                    marker: self.marker.clone(),
                    lines_scanned,
                })
            }
            ReadinessOutcome::TimedOut => {
                let timeout = match self.deadline {
                    Some(deadline) if elapsed >= deadline => deadline,
                    _ => self.startup_timeout,
                };
                error!(lines = lines_scanned, timeout = ?timeout, "Server did not become ready in time");
                Err(HarnessError::StartupTimeout {
                    marker: self.marker.clone(),
                    timeout,
                    lines_scanned,
                })
            }
        }
    }

    /// Tear the server down; failures are logged only
    pub async fn stop(&mut self) {
        info!("Stopping server");
        if let Err(e) = self.backend.down().await {
            warn!(error = %e, "Server teardown failed");
        }
    }
}

impl<B: fmt::Debug> fmt::Debug for ServerLifecycle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerLifecycle")
            .field("backend", &self.backend)
            .field("marker", &self.marker)
            .field("startup_timeout", &self.startup_timeout)
            .field("deadline", &self.deadline)
            .field("reader_join_grace", &self.reader_join_grace)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

async fn terminate_follower<F: LogFollower>(follower: &mut F) {
    if let Err(e) = follower.terminate().await {
        warn!(error = %e, "Failed to terminate log follower");
    }
}
