// ABOUTME: Narrow interface over the log-viewing subprocess
//
// A follower hands out its output stream once and can be terminated. The
// child-process implementation wraps ProcessSupervisor; tests use the
// scripted implementation in process::scripted.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::debug;

use super::supervisor::{ProcessState, ProcessSupervisor, SupervisorError};
use crate::error::{HarnessError, HarnessResult};

/// Output stream of a log follower
pub type LogStream = Box<dyn AsyncRead + Send + Unpin>;

/// A running source of log lines that the lifecycle manager owns
pub trait LogFollower: Send {
    /// Hand over the output stream; only the first call returns it
    fn take_output(&mut self) -> Option<LogStream>;

    /// Stop the source; later calls are no-ops
    fn terminate(&mut self) -> impl Future<Output = Result<(), SupervisorError>> + Send;

    /// Whether the source is still producing
    fn is_running(&mut self) -> bool;
}

/// Log follower backed by a real child process
#[derive(Debug)]
pub struct ChildLogFollower {
    supervisor: ProcessSupervisor,
    command_line: String,
}

impl ChildLogFollower {
    /// Spawn `program args..` in `cwd` and capture its stdout
    ///
    /// # Errors
    /// Returns `SpawnFailed` if the process cannot be launched
    pub fn spawn(
        program: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: Option<&Path>,
        terminate_grace: Duration,
    ) -> HarnessResult<Self> {
        let command_line = render_command_line(program, args);
        let mut supervisor = ProcessSupervisor::new(terminate_grace);

        supervisor.spawn(program, args, env, cwd).map_err(|e| match e {
            SupervisorError::SpawnFailed(source) => {
                HarnessError::spawn_failed(command_line.clone(), source)
            }
            other => HarnessError::Supervisor(other),
        })?;

        debug!(command = %command_line, "Log follower started");
        Ok(Self {
            supervisor,
            command_line,
        })
    }

    /// The command line this follower runs
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Current state of the underlying process
    pub fn state(&mut self) -> ProcessState {
        self.supervisor.check_status()
    }
}

impl LogFollower for ChildLogFollower {
    fn take_output(&mut self) -> Option<LogStream> {
        self.supervisor
            .take_stdout()
            .map(|stdout| Box::new(stdout) as LogStream)
    }

    fn terminate(&mut self) -> impl Future<Output = Result<(), SupervisorError>> + Send {
        self.supervisor.terminate()
    }

    fn is_running(&mut self) -> bool {
        self.supervisor.check_status().is_running()
    }
}

/// Render a program and its arguments for logs and error messages
pub fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
