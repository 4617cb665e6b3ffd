// ABOUTME: Behavioral tests for the reader -> channel -> scanner pipeline
//
// Exercises ordering, early return, closed-stream and silent-stream outcomes
// against in-memory streams, without any subprocess.

use readygate::readiness::{
    LogLine, ReadinessOutcome, ReadinessPipeline, ReaderState, TracingObserver,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

use super::fixtures::{CRASHING_LOG, MARKER, READY_LOG};

/// Slack allowed on top of a timeout for scheduling
const SLACK: Duration = Duration::from_millis(500);

fn script(lines: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
    }
    bytes
}

/// Lines reach the scanner in exactly the order they were written
#[tokio::test]
async fn test_lines_observed_in_emission_order() {
    let total = 5_000;
    let mut lines: Vec<String> = (1..total).map(|i| format!("line {i}")).collect();
    lines.push(MARKER.to_string());
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let bytes = script(&refs);
    let (mut writer, stream) = tokio::io::duplex(256);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = move |line: &LogLine| sink.lock().unwrap().push((line.seq, line.text.clone()));

    let producer = tokio::spawn(async move {
        // Small duplex buffer forces many interleavings with the reader
        writer.write_all(&bytes).await.unwrap();
    });

    let mut pipeline = ReadinessPipeline::spawn(stream, observer, None);
    let outcome = pipeline
        .wait_until_ready(MARKER, Duration::from_secs(10))
        .await;
    producer.await.unwrap();

    assert_eq!(outcome, ReadinessOutcome::Ready);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), total);
    for (index, (seq, text)) in seen.iter().enumerate() {
        assert_eq!(*seq, index as u64 + 1);
        assert_eq!(text, &lines[index]);
    }
    drop(seen);
    pipeline.shutdown(Duration::from_secs(1)).await;
}

/// With the marker on line k the scan reads no more than k lines
#[tokio::test]
async fn test_ready_after_marker_line() {
    let mut pipeline = ReadinessPipeline::spawn(
        std::io::Cursor::new(script(READY_LOG)),
        TracingObserver,
        None,
    );

    let outcome = pipeline
        .wait_until_ready(MARKER, Duration::from_secs(30))
        .await;

    assert_eq!(outcome, ReadinessOutcome::Ready);
    assert_eq!(pipeline.scanner().lines_scanned(), 3);
    assert!(!pipeline.scanner().stream_closed());
    assert_eq!(
        pipeline.shutdown(Duration::from_secs(1)).await,
        ReaderState::Stopped
    );
}

/// A closed stream resolves promptly instead of waiting out the timeout
#[tokio::test]
async fn test_closed_stream_times_out_promptly() {
    let mut pipeline = ReadinessPipeline::spawn(
        std::io::Cursor::new(script(CRASHING_LOG)),
        TracingObserver,
        None,
    );

    let started = Instant::now();
    let outcome = pipeline.wait_until_ready(MARKER, Duration::from_secs(5)).await;

    assert_eq!(outcome, ReadinessOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(pipeline.scanner().stream_closed());
    assert_eq!(pipeline.scanner().lines_scanned(), 2);
    assert_eq!(pipeline.reader_state(), ReaderState::Stopped);
}

/// A silent stream times out no earlier than the timeout and not much later
#[tokio::test]
async fn test_silent_stream_timeout_bounds() {
    let (writer, stream) = tokio::io::duplex(64);
    let timeout = Duration::from_millis(200);
    let mut pipeline = ReadinessPipeline::spawn(stream, TracingObserver, None);

    let started = Instant::now();
    let outcome = pipeline.wait_until_ready(MARKER, timeout).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, ReadinessOutcome::TimedOut);
    assert!(elapsed >= timeout, "returned early after {elapsed:?}");
    assert!(elapsed < timeout + SLACK, "returned late after {elapsed:?}");
    assert!(!pipeline.scanner().stream_closed());

    // Producer still open: teardown must abort the reader
    assert_eq!(pipeline.reader_state(), ReaderState::Running);
    assert_eq!(
        pipeline.shutdown(Duration::from_millis(50)).await,
        ReaderState::Stopped
    );
    drop(writer);
}

/// Every wait gets the full timeout, so a slow but steady log still succeeds
#[tokio::test]
async fn test_timeout_applies_per_line() {
    let (mut writer, stream) = tokio::io::duplex(1024);
    let mut pipeline = ReadinessPipeline::spawn(stream, TracingObserver, None);

    let producer = tokio::spawn(async move {
        for line in READY_LOG {
            tokio::time::sleep(Duration::from_millis(150)).await;
            writer.write_all(format!("{line}\n").as_bytes()).await.unwrap();
        }
        writer
    });

    let outcome = pipeline
        .wait_until_ready(MARKER, Duration::from_millis(400))
        .await;

    assert_eq!(outcome, ReadinessOutcome::Ready);
    assert!(pipeline.scanner().elapsed() >= Duration::from_millis(400));
    drop(producer.await.unwrap());
    pipeline.shutdown(Duration::from_secs(1)).await;
}
