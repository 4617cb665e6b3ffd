// ABOUTME: Orchestration CLI seam: bring the stack up, tear it down, follow its logs
//
// ComposeCli shells out to `docker compose` (or any compatible program);
// ScriptedBackend replays canned behaviour for tests.

pub mod scripted;

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{ComposeConfig, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::process::{render_command_line, ChildLogFollower, LogFollower};

pub use scripted::{BackendProbe, ComposeCall, ScriptedBackend};

/// Verb that starts the stack in the background
pub const UP_ARGS: &[&str] = &["up", "--detach"];

/// Verb that tears the stack down
pub const DOWN_ARGS: &[&str] = &["down"];

/// Verb that streams combined container output until killed
pub const LOGS_ARGS: &[&str] = &["logs", "--no-color", "--follow"];

/// The orchestration operations the server lifecycle needs
pub trait ComposeBackend: Send {
    /// Log source returned by [`follow_logs`](Self::follow_logs)
    type Follower: LogFollower;

    /// Start the stack; a failing command is logged, not returned
    ///
    /// # Errors
    /// Returns `SpawnFailed` if the command cannot be launched
    fn up(&mut self) -> impl Future<Output = HarnessResult<()>> + Send;

    /// Tear the stack down; a failing command is logged, not returned
    ///
    /// # Errors
    /// Returns `SpawnFailed` if the command cannot be launched
    fn down(&mut self) -> impl Future<Output = HarnessResult<()>> + Send;

    /// Start following the stack's combined output
    ///
    /// # Errors
    /// Returns `SpawnFailed` if the follower cannot be launched
    fn follow_logs(&mut self) -> HarnessResult<Self::Follower>;
}

/// Backend that runs a compose-compatible CLI
#[derive(Debug, Clone)]
pub struct ComposeCli {
    config: ComposeConfig,
    terminate_grace: Duration,
}

impl ComposeCli {
    pub fn new(config: ComposeConfig, terminate_grace: Duration) -> Self {
        Self {
            config,
            terminate_grace,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.compose.clone(), config.readiness.terminate_grace)
    }

    /// Full argument list for `verb`: base args, file and project, then the verb
    pub fn command_args(&self, verb: &[&str]) -> Vec<String> {
        let mut args = self.config.base_args.clone();

        if let Some(ref file) = self.config.compose_file {
            args.push("-f".to_string());
            args.push(file.display().to_string());
        }
        if let Some(ref project) = self.config.project_name {
            args.push("-p".to_string());
            args.push(project.clone());
        }

        args.extend(verb.iter().map(|s| (*s).to_string()));
        args
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    fn environment(&self) -> &HashMap<String, String> {
        &self.config.environment
    }

    /// Find the program on PATH before launching anything
    fn resolve_program(&self, args: &[String]) -> HarnessResult<PathBuf> {
        which::which(&self.config.program).map_err(|e| {
            HarnessError::spawn_failed(
                render_command_line(&self.config.program, args),
                io::Error::new(io::ErrorKind::NotFound, e),
            )
        })
    }

    /// Run one verb to completion
    async fn run(&self, verb: &[&str]) -> HarnessResult<()> {
        let args = self.command_args(verb);
        let command_line = render_command_line(&self.config.program, &args);
        let program = self.resolve_program(&args)?;

        debug!(command = %command_line, dir = %self.config.project_dir.display(), "Running orchestration command");

        let output = Command::new(program)
            .args(&args)
            .envs(self.environment())
            .current_dir(&self.config.project_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HarnessError::spawn_failed(command_line.clone(), e))?;

        if output.status.success() {
            info!(command = %command_line, "Orchestration command finished");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                command = %command_line,
                status = %output.status,
                stderr = %stderr.trim(),
                "Orchestration command exited unsuccessfully"
            );
        }

        Ok(())
    }
}

impl ComposeBackend for ComposeCli {
    type Follower = ChildLogFollower;

    fn up(&mut self) -> impl Future<Output = HarnessResult<()>> + Send {
        self.run(UP_ARGS)
    }

    fn down(&mut self) -> impl Future<Output = HarnessResult<()>> + Send {
        self.run(DOWN_ARGS)
    }

    fn follow_logs(&mut self) -> HarnessResult<ChildLogFollower> {
        let args = self.command_args(LOGS_ARGS);
        self.resolve_program(&args)?;

        ChildLogFollower::spawn(
            &self.config.program,
            &args,
            self.environment(),
            Some(&self.config.project_dir),
            self.terminate_grace,
        )
    }
}
