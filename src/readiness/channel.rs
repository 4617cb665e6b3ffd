// ABOUTME: Ordered single-producer/single-consumer hand-off of log lines
//
// The sending half stamps each line with its arrival sequence number. The
// receiving half dequeues with a timeout and reports a closed, drained channel
// distinctly from an elapsed wait.

use std::time::Duration;

use tokio::sync::mpsc;

/// One line of log output with its arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// 1-based position in the stream
    pub seq: u64,
    /// Line text without the trailing newline
    pub text: String,
}

impl LogLine {
    /// Check whether this line contains the marker substring
    pub fn contains(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }
}

/// Result of one timed dequeue attempt
#[derive(Debug, PartialEq, Eq)]
pub enum Recv {
    /// The next line in emission order
    Line(LogLine),
    /// The producer has stopped and every line has been consumed
    Closed,
    /// Nothing arrived within the timeout
    Elapsed,
}

/// Create a connected sender/receiver pair
///
/// The channel is unbounded so the reader never blocks on a slow scanner.
pub fn readiness_channel() -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LineSender { tx, next_seq: 1 }, LineReceiver { rx })
}

/// Producing half, owned by the line reader
#[derive(Debug)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<LogLine>,
    next_seq: u64,
}

impl LineSender {
    /// Push a line; returns false once the receiver has gone away
    pub fn send(&mut self, text: String) -> bool {
        let line = LogLine {
            seq: self.next_seq,
            text,
        };
        if self.tx.send(line).is_err() {
            return false;
        }
        self.next_seq += 1;
        true
    }

    /// Number of lines sent so far
    pub fn sent(&self) -> u64 {
        self.next_seq - 1
    }

    /// Whether the receiving half has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half, owned by the readiness scanner
#[derive(Debug)]
pub struct LineReceiver {
    rx: mpsc::UnboundedReceiver<LogLine>,
}

impl LineReceiver {
    /// Wait up to `timeout` for the next line
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Recv {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(line)) => Recv::Line(line),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Elapsed,
        }
    }
}
