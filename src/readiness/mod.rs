// ABOUTME: Readiness detection pipeline over a live log stream
// ABOUTME: Line reader task -> ordered channel -> scanner with per-attempt timeout

//! Readiness detection over a live log stream.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   LogLine    ┌──────────────┐   LogLine   ┌──────────────────┐
//! │ process output │─────────────▶│  LineReader  │────────────▶│ ReadinessScanner │
//! │ (AsyncRead)    │  read_until  │ (tokio task) │  unbounded  │ (caller's task)  │
//! └────────────────┘              └──────────────┘    mpsc     └──────────────────┘
//!                                                                       │
//!                                                          Ready / TimedOut
//! ```
//!
//! The reader owns the sending half and the scanner the receiving half, so
//! the channel is single-producer/single-consumer and preserves emission
//! order. A closed, drained channel is reported as `TimedOut`.
//!
//! # Usage
//!
//! ```ignore
//! let mut pipeline = ReadinessPipeline::spawn(child_stdout, TracingObserver, None);
//! let outcome = pipeline.wait_until_ready("server up", Duration::from_secs(30)).await;
//! // terminate the producing process here, then:
//! pipeline.shutdown(Duration::from_secs(2)).await;
//! ```

pub mod channel;
pub mod reader;
pub mod scanner;

use std::time::Duration;

use tokio::io::AsyncRead;

pub use channel::{readiness_channel, LineReceiver, LineSender, LogLine, Recv};
pub use reader::{LineReader, ReaderState};
pub use scanner::{BoxedObserver, LineObserver, ReadinessScanner, TracingObserver};

/// Terminal result of one readiness scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// A line containing the marker was seen
    Ready,
    /// A wait elapsed, or the stream closed, before the marker was seen
    TimedOut,
}

impl ReadinessOutcome {
    /// True for `Ready`
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// A reader task and its scanner, wired through a fresh channel
#[derive(Debug)]
pub struct ReadinessPipeline<O = TracingObserver> {
    reader: LineReader,
    scanner: ReadinessScanner<O>,
}

impl<O: LineObserver> ReadinessPipeline<O> {
    /// Start reading `stream` and prepare a scanner over it
    pub fn spawn<R>(stream: R, observer: O, deadline: Option<Duration>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, receiver) = readiness_channel();
        let reader = LineReader::spawn(stream, sender);
        let scanner = ReadinessScanner::with_observer(receiver, observer).with_deadline(deadline);
        Self { reader, scanner }
    }

    /// Run the scan; see [`ReadinessScanner::wait_until_ready`]
    pub async fn wait_until_ready(&mut self, marker: &str, timeout: Duration) -> ReadinessOutcome {
        self.scanner.wait_until_ready(marker, timeout).await
    }

    /// Scanner diagnostics from the last scan
    pub fn scanner(&self) -> &ReadinessScanner<O> {
        &self.scanner
    }

    /// Current reader state
    pub fn reader_state(&self) -> ReaderState {
        self.reader.state()
    }

    /// Join the reader, aborting it after `grace`, and drop the channel
    pub async fn shutdown(self, grace: Duration) -> ReaderState {
        let Self { reader, scanner } = self;
        let state = reader.join(grace).await;
        drop(scanner);
        state
    }
}
