// ABOUTME: Compose backend double that records calls and serves scripted log followers

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use super::ComposeBackend;
use crate::error::{HarnessError, HarnessResult};
use crate::process::{FollowerProbe, LogScript, ScriptedFollower};

/// One recorded backend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCall {
    Up,
    Down,
    FollowLogs,
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<ComposeCall>,
    followers: Vec<FollowerProbe>,
}

/// Read side of a [`ScriptedBackend`], usable after the backend is moved
#[derive(Debug, Clone, Default)]
pub struct BackendProbe {
    recorded: Arc<Mutex<Recorded>>,
}

impl BackendProbe {
    /// Operations in the order they were requested
    pub fn calls(&self) -> Vec<ComposeCall> {
        self.lock().calls.clone()
    }

    /// Probes of every follower handed out so far
    pub fn followers(&self) -> Vec<FollowerProbe> {
        self.lock().followers.clone()
    }

    fn record(&self, call: ComposeCall) {
        self.lock().calls.push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Backend whose `follow_logs` replays a [`LogScript`]
#[derive(Debug)]
pub struct ScriptedBackend {
    script: LogScript,
    probe: BackendProbe,
    fail_up: bool,
    fail_down: bool,
    fail_follow: bool,
    without_output: bool,
}

impl ScriptedBackend {
    pub fn new(script: LogScript) -> Self {
        Self {
            script,
            probe: BackendProbe::default(),
            fail_up: false,
            fail_down: false,
            fail_follow: false,
            without_output: false,
        }
    }

    /// `up` fails as if the program could not be launched
    #[must_use]
    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    /// `down` fails as if the program could not be launched
    #[must_use]
    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }

    /// `follow_logs` fails as if the program could not be launched
    #[must_use]
    pub fn failing_follow(mut self) -> Self {
        self.fail_follow = true;
        self
    }

    /// `follow_logs` succeeds but the follower has no output stream
    #[must_use]
    pub fn without_output(mut self) -> Self {
        self.without_output = true;
        self
    }

    pub fn probe(&self) -> BackendProbe {
        self.probe.clone()
    }

    fn outcome(fail: bool, command: &str) -> HarnessResult<()> {
        if fail {
            return Err(HarnessError::spawn_failed(
                command,
                io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
            ));
        }
        Ok(())
    }
}

impl ComposeBackend for ScriptedBackend {
    type Follower = ScriptedFollower;

    fn up(&mut self) -> impl Future<Output = HarnessResult<()>> + Send {
        self.probe.record(ComposeCall::Up);
        let result = Self::outcome(self.fail_up, "scripted up");
        async move { result }
    }

    fn down(&mut self) -> impl Future<Output = HarnessResult<()>> + Send {
        self.probe.record(ComposeCall::Down);
        let result = Self::outcome(self.fail_down, "scripted down");
        async move { result }
    }

    fn follow_logs(&mut self) -> HarnessResult<ScriptedFollower> {
        self.probe.record(ComposeCall::FollowLogs);
        Self::outcome(self.fail_follow, "scripted logs")?;

        let follower = if self.without_output {
            ScriptedFollower::without_output()
        } else {
            ScriptedFollower::new(self.script.clone())
        };
        self.probe.lock().followers.push(follower.probe());
        Ok(follower)
    }
}
