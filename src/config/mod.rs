// ABOUTME: Configuration management for readygate
// Handles the orchestration CLI invocation and readiness detection settings

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "READYGATE_";

/// Marker printed by the server once it accepts requests
pub const DEFAULT_MARKER: &str = "Graylog server up and running.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// How the orchestration CLI is invoked
    #[serde(default)]
    pub compose: ComposeConfig,

    /// How readiness is detected
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Program to run, resolved on PATH (default: "docker")
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every verb (default: ["compose"])
    #[serde(default = "default_base_args")]
    pub base_args: Vec<String>,

    /// Directory the CLI runs in; relative paths resolve against the cwd
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Explicit compose file (`-f`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_file: Option<PathBuf>,

    /// Explicit project name (`-p`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Extra environment variables for every CLI invocation
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            base_args: default_base_args(),
            project_dir: default_project_dir(),
            compose_file: None,
            project_name: None,
            environment: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Substring whose appearance in a log line means the server is ready
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Budget for each wait on the next log line, in seconds (default: 60)
    #[serde(default = "default_startup_timeout", with = "duration_secs")]
    pub startup_timeout: Duration,

    /// Optional cap on the whole scan, in seconds
    #[serde(
        default,
        with = "option_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Duration>,

    /// How long teardown waits for the line reader before aborting it
    #[serde(default = "default_grace", with = "duration_secs")]
    pub reader_join_grace: Duration,

    /// Time between SIGTERM and SIGKILL for the log follower
    #[serde(default = "default_grace", with = "duration_secs")]
    pub terminate_grace: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            startup_timeout: default_startup_timeout(),
            deadline: None,
            reader_join_grace: default_grace(),
            terminate_grace: default_grace(),
        }
    }
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_base_args() -> Vec<String> {
    vec!["compose".to_string()]
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_startup_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_grace() -> Duration {
    Duration::from_secs(2)
}

impl HarnessConfig {
    /// Load configuration from default locations
    ///
    /// The first config file found wins; environment overrides are applied
    /// on top and the result is validated.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Load configuration, reading `explicit` instead of searching when given
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => match Self::locate() {
                Some(path) => Self::load_from_path(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(&load_from_env())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse one config file, without overrides
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: HarnessConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// The config file `load` would read, if any exists
    pub fn locate() -> Option<PathBuf> {
        first_existing(&Self::get_config_paths()).cloned()
    }

    /// Write this configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Get configuration file paths in order of precedence
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        // 1. Local project config
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(".readygate").join("config.toml"));
        }

        // 2. User config (~/.readygate/config.toml)
        if let Ok(config_dir) = Self::get_user_config_dir() {
            paths.push(config_dir.join("config.toml"));
        }

        // 3. System config
        paths.push(PathBuf::from("/etc/readygate/config.toml"));

        paths
    }

    /// Get user configuration directory
    fn get_user_config_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home_dir.join(".readygate"))
    }

    /// Apply `READYGATE_*` overrides collected by [`load_from_env`]
    pub fn apply_env_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            match key.strip_prefix(ENV_PREFIX).unwrap_or(key) {
                "MARKER" => self.readiness.marker = value.clone(),
                "STARTUP_TIMEOUT" => {
                    self.readiness.startup_timeout = parse_secs(key, value)?;
                }
                "DEADLINE" => self.readiness.deadline = Some(parse_secs(key, value)?),
                "PROJECT_DIR" => self.compose.project_dir = PathBuf::from(value),
                "PROGRAM" => self.compose.program = value.clone(),
                _ => tracing::trace!(key = %key, "Ignoring unknown override"),
            }
        }
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.readiness.marker.is_empty() {
            bail!("readiness.marker must not be empty");
        }
        if self.compose.program.trim().is_empty() {
            bail!("compose.program must not be empty");
        }
        if self.readiness.startup_timeout.is_zero() {
            bail!("readiness.startup_timeout must be greater than zero");
        }
        if self.readiness.deadline.is_some_and(|d| d.is_zero()) {
            bail!("readiness.deadline must be greater than zero when set");
        }
        Ok(())
    }
}

/// Load configuration from environment
pub fn load_from_env() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

fn first_existing(paths: &[PathBuf]) -> Option<&PathBuf> {
    paths.iter().find(|path| path.is_file())
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {value:?}"))?;
    Ok(Duration::from_secs(secs))
}

/// Serde helper for Duration as seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
