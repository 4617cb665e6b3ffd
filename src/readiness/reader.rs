// ABOUTME: Background task draining a process output stream into the readiness channel
//
// One tokio task per reader. The task forwards every non-empty line in order
// and exits on end-of-input, on a read error, or when the receiver is gone.
// ReaderState flips to Stopped on every exit path, including abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::channel::LineSender;

/// Lifecycle of a line reader task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Still forwarding lines
    Running,
    /// Task has exited (end-of-input, error, or stop)
    Stopped,
}

/// Marks the reader stopped when dropped, so aborts and panics count too
struct StoppedOnDrop(Arc<AtomicBool>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running line reader task
///
/// Dropping the handle without joining aborts the task.
#[derive(Debug)]
pub struct LineReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl LineReader {
    /// Start draining `stream` into `sender` on a dedicated task
    pub fn spawn<R>(stream: R, sender: LineSender) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let guard = StoppedOnDrop(Arc::clone(&running));

        let handle = tokio::spawn(async move {
            let sender = Self::drain(stream, sender).await;
            // Stopped must be visible no later than the channel closing
            drop(guard);
            drop(sender);
        });

        Self {
            handle: Some(handle),
            running,
        }
    }

    async fn drain<R>(stream: R, mut sender: LineSender) -> LineSender
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!(lines = sender.sent(), "Log stream reached end of input");
                    break;
                }
                Ok(_) => {
                    let text = decode_line(&buf);
                    if text.is_empty() {
                        continue;
                    }
                    if !sender.send(text) {
                        debug!(
                            lines = sender.sent(),
                            "Readiness channel closed, stopping line reader"
                        );
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, lines = sender.sent(), "Error reading log stream");
                    break;
                }
            }
        }

        sender
    }

    /// Current state of the reader task
    pub fn state(&self) -> ReaderState {
        if self.running.load(Ordering::SeqCst) {
            ReaderState::Running
        } else {
            ReaderState::Stopped
        }
    }

    /// Wait for the task to exit, aborting it if it outlives `grace`
    ///
    /// Returns only after the task has exited.
    pub async fn join(mut self, grace: Duration) -> ReaderState {
        let Some(mut handle) = self.handle.take() else {
            return self.state();
        };

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {
                debug!("Line reader finished");
            }
            Ok(Err(e)) => {
                error!(error = %e, "Line reader task failed");
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis(),
                    "Line reader still running after grace period, aborting"
                );
                handle.abort();
                // Cancellation is reported as an error; the task is gone either way
                let _ = handle.await;
            }
        }

        self.state()
    }

    /// Stop the reader immediately and wait for it to exit
    pub async fn stop(self) -> ReaderState {
        self.join(Duration::ZERO).await
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
