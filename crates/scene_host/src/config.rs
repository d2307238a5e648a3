//! Host configuration, read from an optional RON file.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scene_core::Deadlines;
use scene_engine::DownloadSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "SCENE_BATCH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Destination for log output. Stdout is never an option: it carries frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogDestination {
    File,
    Stderr,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub destination: LogDestination,
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::File,
            level: "info".to_string(),
            file: PathBuf::from("./scene_batch.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        let defaults = DownloadSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            max_bytes: defaults.max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directory holding the persisted workflow state.
    pub state_dir: PathBuf,
    /// Root that output folders are created in for host-side downloads.
    pub output_root: PathBuf,
    pub log: LogConfig,
    /// How long the page gets to acknowledge a submission.
    pub submit_ack_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub download: DownloadConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        let output_root = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("output");
        let deadlines = Deadlines::default();
        Self {
            state_dir: output_root.clone(),
            output_root,
            log: LogConfig::default(),
            submit_ack_timeout_secs: 15,
            generation_timeout_secs: deadlines.generation.as_secs(),
            download_timeout_secs: deadlines.download.as_secs(),
            download: DownloadConfig::default(),
        }
    }
}

impl HostConfig {
    /// Loads the config at `path`, or defaults when no path was given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            generation: Duration::from_secs(self.generation_timeout_secs.max(1)),
            download: Duration::from_secs(self.download_timeout_secs.max(1)),
        }
    }

    pub fn submit_ack_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_ack_timeout_secs.max(1))
    }

    pub fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            connect_timeout: Duration::from_secs(self.download.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.download.request_timeout_secs),
            max_bytes: self.download.max_bytes,
            ..DownloadSettings::default()
        }
    }
}

/// Picks the config path from `--config <path>` or `--config=<path>`, falling
/// back to the environment. The browser passes its own arguments (the caller
/// origin, a parent window handle) which are ignored.
pub fn config_path_from<I>(args: I, env_value: Option<OsString>) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return Some(PathBuf::from(path));
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    env_value
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
