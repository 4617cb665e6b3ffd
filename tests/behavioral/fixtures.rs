// ABOUTME: Shared test fixtures and utilities for behavioral tests
//
// Provides:
// - FakeCompose: temporary compose project driven by a shell stand-in for `docker compose`
// - sh_available(): Check if a POSIX shell is installed
// - require_sh!(): Skip test if sh unavailable
// - process_alive(): Check whether a pid still exists

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

use readygate::config::{ComposeConfig, HarnessConfig, ReadinessConfig};

/// Marker the fake server prints once it is up
pub const MARKER: &str = "Graylog server up and running.";

/// Log of a server that becomes ready on its third line
pub const READY_LOG: &[&str] = &[
    "Starting...",
    "Loading modules",
    MARKER,
    "Ready for requests",
];

/// Log of a server that dies before becoming ready
pub const CRASHING_LOG: &[&str] = &["Starting...", "Loading modules"];

// Records every invocation in the project dir. For `logs` it prints log.txt
// and, when the `hold` file exists, keeps the stream open until killed.
const FAKE_COMPOSE_SCRIPT: &str = r#"
echo "$*" >> calls.log
case "$1" in
  logs)
    echo $$ > logs.pid
    cat log.txt
    if [ -f hold ]; then exec sleep 30; fi
    ;;
esac
exit 0
"#;

/// How the fake log stream ends once its lines are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEnd {
    /// The follower exits, closing the stream
    Close,
    /// The follower stays alive until terminated
    Hold,
}

/// A temporary compose project with a fake orchestration CLI
pub struct FakeCompose {
    pub dir: TempDir,
    script: PathBuf,
}

impl FakeCompose {
    /// Create a project whose `logs` prints `lines` and then ends as `end` says
    pub fn new(lines: &[&str], end: LogEnd) -> Result<Self> {
        let dir = TempDir::new()?;
        let script = dir.path().join("fake-compose.sh");
        std::fs::write(&script, FAKE_COMPOSE_SCRIPT)?;

        let mut log = lines.join("\n");
        if !log.is_empty() {
            log.push('\n');
        }
        std::fs::write(dir.path().join("log.txt"), log)?;

        if end == LogEnd::Hold {
            std::fs::write(dir.path().join("hold"), "")?;
        }

        Ok(Self { dir, script })
    }

    /// Get the project directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Compose settings that run the fake CLI through `sh`
    pub fn compose_config(&self) -> ComposeConfig {
        ComposeConfig {
            program: "sh".to_string(),
            base_args: vec![self.script.display().to_string()],
            project_dir: self.path().to_path_buf(),
            ..ComposeConfig::default()
        }
    }

    /// Full configuration with a short reader grace for fast teardown
    pub fn config(&self, startup_timeout: Duration) -> HarnessConfig {
        HarnessConfig {
            compose: self.compose_config(),
            readiness: ReadinessConfig {
                marker: MARKER.to_string(),
                startup_timeout,
                deadline: None,
                reader_join_grace: Duration::from_secs(1),
                terminate_grace: Duration::from_millis(500),
            },
        }
    }

    /// Arguments of every invocation so far, oldest first
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Pid of the last log follower, once it has started
    pub fn follower_pid(&self) -> Option<i32> {
        std::fs::read_to_string(self.path().join("logs.pid"))
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

/// Check if a POSIX shell is available on the system
pub fn sh_available() -> bool {
    Command::new("sh")
        .args(["-c", "exit 0"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Macro to skip test if sh is not available
#[macro_export]
macro_rules! require_sh {
    () => {
        if !super::fixtures::sh_available() {
            eprintln!("Skipping test: sh not available");
            return Ok(());
        }
    };
}

/// Whether a process with this pid still exists
pub fn process_alive(pid: i32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Signal 0: existence check only
    kill(Pid::from_raw(pid), None::<Signal>).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_compose_layout() -> Result<()> {
        let fake = FakeCompose::new(READY_LOG, LogEnd::Hold)?;
        assert!(fake.path().join("fake-compose.sh").exists());
        assert!(fake.path().join("hold").exists());

        let log = std::fs::read_to_string(fake.path().join("log.txt"))?;
        assert_eq!(log.lines().count(), 4);
        assert!(fake.calls().is_empty());
        assert_eq!(fake.follower_pid(), None);
        Ok(())
    }
}
