// ABOUTME: Consumes log lines until the readiness marker appears or a wait times out
//
// Each dequeue attempt gets the full per-attempt timeout. An exhausted, closed
// channel resolves to TimedOut exactly like an elapsed wait.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::channel::{LineReceiver, LogLine, Recv};
use super::ReadinessOutcome;

/// Diagnostic hook that sees every scanned line before it is matched
pub trait LineObserver {
    /// Called once per dequeued line, in arrival order
    fn observe(&mut self, line: &LogLine);
}

impl<F> LineObserver for F
where
    F: FnMut(&LogLine),
{
    fn observe(&mut self, line: &LogLine) {
        self(line);
    }
}

/// Type-erased observer, used where the observer is chosen at runtime
pub type BoxedObserver = Box<dyn FnMut(&LogLine) + Send>;

/// Default observer: every line at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LineObserver for TracingObserver {
    fn observe(&mut self, line: &LogLine) {
        debug!(seq = line.seq, line = %line.text, "server log");
    }
}

/// Single consumer of a readiness channel
#[derive(Debug)]
pub struct ReadinessScanner<O = TracingObserver> {
    receiver: LineReceiver,
    observer: O,
    deadline: Option<Duration>,
    lines_scanned: u64,
    stream_closed: bool,
    elapsed: Duration,
}

impl ReadinessScanner<TracingObserver> {
    /// Scanner that logs every line through tracing
    pub fn new(receiver: LineReceiver) -> Self {
        Self::with_observer(receiver, TracingObserver)
    }
}

impl<O: LineObserver> ReadinessScanner<O> {
    /// Scanner with a custom line observer
    pub fn with_observer(receiver: LineReceiver, observer: O) -> Self {
        Self {
            receiver,
            observer,
            deadline: None,
            lines_scanned: 0,
            stream_closed: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Also give up once the whole scan has run for `deadline`
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Block until a line contains `marker` or a dequeue attempt times out
    ///
    /// Each attempt waits up to `timeout`. A closed and drained channel
    /// resolves to `TimedOut` immediately instead of waiting.
    pub async fn wait_until_ready(&mut self, marker: &str, timeout: Duration) -> ReadinessOutcome {
        let started = Instant::now();
        info!(marker = %marker, timeout_ms = timeout.as_millis(), "Waiting for readiness marker");

        let outcome = loop {
            let attempt = match self.deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        warn!(
                            deadline_ms = deadline.as_millis(),
                            lines = self.lines_scanned,
                            "Readiness deadline exhausted"
                        );
                        break ReadinessOutcome::TimedOut;
                    }
                    timeout.min(remaining)
                }
                None => timeout,
            };

            match self.receiver.recv_timeout(attempt).await {
                Recv::Line(line) => {
                    self.lines_scanned += 1;
                    self.observer.observe(&line);
                    if line.contains(marker) {
                        break ReadinessOutcome::Ready;
                    }
                }
                Recv::Closed => {
                    self.stream_closed = true;
                    warn!(
                        lines = self.lines_scanned,
                        "Log stream closed before readiness marker"
                    );
                    break ReadinessOutcome::TimedOut;
                }
                Recv::Elapsed => {
                    if self.deadline.is_some_and(|d| started.elapsed() >= d) {
                        continue;
                    }
                    warn!(
                        timeout_ms = attempt.as_millis(),
                        lines = self.lines_scanned,
                        "No log line within timeout"
                    );
                    break ReadinessOutcome::TimedOut;
                }
            }
        };

        self.elapsed = started.elapsed();
        info!(
            outcome = ?outcome,
            lines = self.lines_scanned,
            elapsed_ms = self.elapsed.as_millis(),
            "Readiness scan finished"
        );
        outcome
    }

    /// Lines consumed by the last scan, including the matching one
    pub fn lines_scanned(&self) -> u64 {
        self.lines_scanned
    }

    /// Whether the last scan ended because the stream closed
    pub fn stream_closed(&self) -> bool {
        self.stream_closed
    }

    /// Wall time of the last scan
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
