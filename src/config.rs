//! Server configuration
//!
//! Loaded from an optional TOML file; every key has a default, so an empty
//! file (or no file) yields a working configuration. The binary applies CLI
//! overrides on top before calling [`Config::validate`].

use crate::evaluator::AngleUnit;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Sessions served at the same time; further clients wait.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    /// Longest accepted request line, in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_sessions() -> usize {
    1
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_max_line_length() -> usize {
    4096
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            max_line_length: default_max_line_length(),
        }
    }
}

/// `[history]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    /// Load the history file at startup
    #[serde(default = "default_true")]
    pub autoload: bool,
    /// Save the history file on `EXIT` and at shutdown
    #[serde(default = "default_true")]
    pub autosave: bool,
    /// Unbounded when unset
    #[serde(default)]
    pub max_entries: Option<usize>,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("calculator_history.dat")
}

fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            autoload: true,
            autosave: true,
            max_entries: None,
        }
    }
}

/// `[evaluator]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub angle_unit: AngleUnit,
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

impl Config {
    /// Load and validate a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML for
    /// this schema, or fails [`Config::validate`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        for (name, value) in [
            ("server.max_sessions", server.max_sessions as u64),
            ("server.idle_timeout_secs", server.idle_timeout_secs),
            ("server.write_timeout_secs", server.write_timeout_secs),
            ("server.max_line_length", server.max_line_length as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        if self.history.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "history.max_entries must be at least 1 when set".into(),
            ));
        }
        if self.history.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("history.path must not be empty".into()));
        }
        Ok(())
    }
}
