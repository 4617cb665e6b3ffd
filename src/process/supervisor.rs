// ABOUTME: Supervision of a single child process with graceful termination
//
// Spawns a command with piped stdout, polls its status without blocking and
// terminates it exactly once: SIGTERM, a grace period, then SIGKILL. The child
// is also killed on drop so an unwinding caller cannot leak it.

// Allow if-let/else patterns instead of map_or_else for readability
#![allow(clippy::option_if_let_else)]

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error, info, warn};

/// Default time between SIGTERM and SIGKILL
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Errors that can occur during process supervision
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Process spawn failed
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// Process already running
    #[error("Process already running with PID {0}")]
    AlreadyRunning(u32),

    /// Termination failed
    #[error("Failed to terminate process: {0}")]
    TerminateFailed(#[source] std::io::Error),

    /// Invalid command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Current state of a supervised process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// Process has not been started yet
    NotStarted,

    /// Process is running with the given PID
    Running {
        /// Process ID
        pid: u32,
    },

    /// Process exited normally with exit code
    Exited {
        /// Exit code from the process
        code: i32,
    },

    /// Process was terminated by a signal
    Signaled {
        /// Signal number that terminated the process
        signal: i32,
    },

    /// Process failed to start or run
    Failed {
        /// Description of the failure
        reason: String,
    },
}

impl ProcessState {
    /// Returns true if the process is currently running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    fn from_exit(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited { code };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled { signal };
            }
        }

        Self::Failed {
            reason: "Unknown termination".to_string(),
        }
    }
}

/// Supervisor owning one child process
#[derive(Debug)]
pub struct ProcessSupervisor {
    /// The child process (if running)
    child: Option<Child>,

    /// Child's stdout, until handed to a reader
    stdout: Option<ChildStdout>,

    /// Current process state
    state: ProcessState,

    /// Time allowed between SIGTERM and SIGKILL
    terminate_grace: Duration,
}

impl ProcessSupervisor {
    /// Create a supervisor that waits `terminate_grace` before force-killing
    #[must_use]
    pub const fn new(terminate_grace: Duration) -> Self {
        Self {
            child: None,
            stdout: None,
            state: ProcessState::NotStarted,
            terminate_grace,
        }
    }

    /// Spawn a new process
    ///
    /// # Arguments
    /// * `command` - The command to execute
    /// * `args` - Command arguments
    /// * `env` - Environment variables to set
    /// * `cwd` - Optional working directory
    ///
    /// stdout is piped and available through [`take_stdout`](Self::take_stdout);
    /// stderr is inherited so it stays visible to the operator.
    ///
    /// # Errors
    /// Returns error if process is already running, the command is empty, or spawn fails
    pub fn spawn(
        &mut self,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: Option<&Path>,
    ) -> Result<(), SupervisorError> {
        if let ProcessState::Running { pid } = self.state {
            return Err(SupervisorError::AlreadyRunning(pid));
        }

        if command.is_empty() {
            return Err(SupervisorError::InvalidCommand(
                "Command cannot be empty".to_string(),
            ));
        }

        debug!(command = %command, args = ?args, "Spawning supervised process");

        let mut process_cmd = Command::new(command);
        process_cmd
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);

        for (key, value) in env {
            process_cmd.env(key, value);
        }

        if let Some(dir) = cwd {
            process_cmd.current_dir(dir);
        }

        let mut child = process_cmd.spawn().map_err(SupervisorError::SpawnFailed)?;
        let stdout = child.stdout.take();
        let pid = child.id().unwrap_or(0);

        info!(pid = pid, command = %command, "Supervised process spawned");

        self.child = Some(child);
        self.stdout = stdout;
        self.state = ProcessState::Running { pid };

        Ok(())
    }

    /// Check the current status of the process
    ///
    /// Polls the child without blocking and updates the state if it has exited.
    pub fn check_status(&mut self) -> ProcessState {
        if let Some(ref mut child) = self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let new_state = ProcessState::from_exit(status);
                    debug!(state = ?new_state, "Supervised process exited");
                    self.state = new_state;
                    self.child = None;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Failed to check process status");
                    self.state = ProcessState::Failed {
                        reason: format!("Status check failed: {e}"),
                    };
                }
            }
        }

        self.state.clone()
    }

    /// Gracefully terminate the process
    ///
    /// Sends SIGTERM, waits up to the grace period, then sends SIGKILL.
    /// Calling this again after the process is gone is a no-op.
    ///
    /// # Errors
    /// Returns error if the process could not be killed
    pub async fn terminate(&mut self) -> Result<(), SupervisorError> {
        let Some(ref mut child) = self.child else {
            return Ok(());
        };

        let pid = child.id().unwrap_or(0);
        info!(pid = pid, "Terminating supervised process");

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if pid > 0 {
                // Safe cast: pid is u32, fits in i32 for typical PIDs
                #[allow(clippy::cast_possible_wrap)]
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let final_state = match tokio::time::timeout(self.terminate_grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = pid, "Process terminated gracefully");
                ProcessState::from_exit(status)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Error waiting for process");
                ProcessState::Failed {
                    reason: format!("Wait failed: {e}"),
                }
            }
            Err(_) => {
                warn!(
                    pid = pid,
                    "Process did not terminate gracefully, sending SIGKILL"
                );

                if let Err(e) = child.kill().await {
                    error!(error = %e, "Failed to kill process");
                    return Err(SupervisorError::TerminateFailed(e));
                }

                ProcessState::Signaled { signal: 9 }
            }
        };

        self.state = final_state;
        self.child = None;
        self.stdout = None;

        Ok(())
    }

    /// Take ownership of the child's stdout handle
    ///
    /// This can only be called once - subsequent calls return None.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Check if the process is currently running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Get a reference to the current process state
    #[must_use]
    pub const fn state(&self) -> &ProcessState {
        &self.state
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATE_GRACE)
    }
}
