// ABOUTME: In-memory log follower that replays a script of lines and pauses
//
// Stands in for the log-viewing subprocess in tests and dry runs. The script
// is written by a feeder task into a duplex pipe; terminating the follower
// aborts the feeder, which closes the pipe exactly like a killed process.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use super::follower::{LogFollower, LogStream};
use super::supervisor::SupervisorError;

/// Buffer between the feeder task and the reader
const SCRIPT_PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum ScriptStep {
    Line(String),
    Pause(Duration),
}

/// Ordered lines and pauses to replay
#[derive(Debug, Clone, Default)]
pub struct LogScript {
    steps: Vec<ScriptStep>,
    hold_open: bool,
}

impl LogScript {
    /// Empty script that closes its stream once replayed
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line
    #[must_use]
    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Line(text.into()));
        self
    }

    /// Append several lines
    #[must_use]
    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .extend(lines.into_iter().map(|l| ScriptStep::Line(l.into())));
        self
    }

    /// Wait before the next step
    #[must_use]
    pub fn pause(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Pause(duration));
        self
    }

    /// Keep the stream open after the last step until terminated
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

/// Counters shared between a scripted follower and the test observing it
#[derive(Debug, Clone, Default)]
pub struct FollowerProbe {
    terminations: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl FollowerProbe {
    /// How many times terminate was called
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Whether the follower is still producing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Log follower replaying a [`LogScript`]
#[derive(Debug)]
pub struct ScriptedFollower {
    script: Option<LogScript>,
    feeder: Option<JoinHandle<()>>,
    probe: FollowerProbe,
}

impl ScriptedFollower {
    /// Follower that will replay `script` once its output is taken
    pub fn new(script: LogScript) -> Self {
        let probe = FollowerProbe::default();
        probe.running.store(true, Ordering::SeqCst);
        Self {
            script: Some(script),
            feeder: None,
            probe,
        }
    }

    /// Follower whose output stream is unavailable, like a process that
    /// started without a pipe
    pub fn without_output() -> Self {
        let mut follower = Self::new(LogScript::new());
        follower.script = None;
        follower
    }

    /// Handle for observing this follower after it has been moved
    pub fn probe(&self) -> FollowerProbe {
        self.probe.clone()
    }

    async fn feed(script: LogScript, mut writer: tokio::io::DuplexStream) {
        for step in script.steps {
            match step {
                ScriptStep::Line(text) => {
                    let mut bytes = text.into_bytes();
                    bytes.push(b'\n');
                    if writer.write_all(&bytes).await.is_err() {
                        return;
                    }
                }
                ScriptStep::Pause(duration) => tokio::time::sleep(duration).await,
            }
        }

        if script.hold_open {
            std::future::pending::<()>().await;
        }
    }
}

impl LogFollower for ScriptedFollower {
    /// Starts the feeder task; must be called inside a tokio runtime
    fn take_output(&mut self) -> Option<LogStream> {
        let script = self.script.take()?;
        let (writer, reader) = tokio::io::duplex(SCRIPT_PIPE_CAPACITY);
        let running = Arc::clone(&self.probe.running);

        self.feeder = Some(tokio::spawn(async move {
            Self::feed(script, writer).await;
            running.store(false, Ordering::SeqCst);
        }));

        Some(Box::new(reader))
    }

    fn terminate(&mut self) -> impl Future<Output = Result<(), SupervisorError>> + Send {
        self.probe.terminations.fetch_add(1, Ordering::SeqCst);
        let feeder = self.feeder.take();
        let running = Arc::clone(&self.probe.running);

        async move {
            if let Some(feeder) = feeder {
                feeder.abort();
                let _ = feeder.await;
            }
            running.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn is_running(&mut self) -> bool {
        self.probe.is_running()
    }
}
