// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Settings come from an optional TOML file, then `KVAPI_*` environment
//! variables, with later sources winning.

use kv_core::DEFAULT_QUEUE_CAPACITY;
use kv_storage::{FileConfig, GapPolicy, LoggerConfig, SqliteConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const ENV_LISTEN: &str = "KVAPI_LISTEN";
pub const ENV_BACKEND: &str = "KVAPI_BACKEND";
pub const ENV_LOG_FILE: &str = "KVAPI_LOG_FILE";
pub const ENV_DB_PATH: &str = "KVAPI_DB_PATH";
pub const ENV_QUEUE_CAPACITY: &str = "KVAPI_QUEUE_CAPACITY";
pub const ENV_GAP_POLICY: &str = "KVAPI_GAP_POLICY";
pub const ENV_DAEMON_LOG: &str = "KVAPI_LOG";

// Names used in errors for values taken from the TOML file
const FILE_LISTEN: &str = "listen (config file)";
const FILE_QUEUE_CAPACITY: &str = "queue_capacity (config file)";

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_LOG_FILE: &str = "transaction.log";
const DEFAULT_DB_PATH: &str = "kvapi.db";
const ZERO_CAPACITY: &str = "capacity must be at least 1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid {setting} {value:?}: {reason}")]
    Invalid {
        setting: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(setting: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            setting,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which durable medium backs the transaction log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            _ => Err("expected \"file\" or \"sqlite\"".to_string()),
        }
    }
}

/// Shape of the optional TOML file; every key may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    listen: Option<String>,
    backend: Option<BackendKind>,
    log_file: Option<PathBuf>,
    db_path: Option<PathBuf>,
    queue_capacity: Option<usize>,
    gap_policy: Option<GapPolicy>,
    daemon_log: Option<PathBuf>,
}

/// Resolved daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen address
    pub listen: SocketAddr,
    pub backend: BackendKind,
    /// Transaction log path for the file backend
    pub log_file: PathBuf,
    /// Database path for the sqlite backend
    pub db_path: PathBuf,
    /// Pending-write queue capacity
    pub queue_capacity: usize,
    pub gap_policy: GapPolicy,
    /// Diagnostics log file; stderr when unset
    pub daemon_log: Option<PathBuf>,
}

impl Config {
    /// Configuration from the process environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(None, |name| std::env::var(name).ok())
    }

    /// Configuration from a TOML file overlaid with the process environment
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_sources(Some(&content), |name| std::env::var(name).ok())
    }

    /// Resolve settings from TOML text and a variable lookup
    pub fn from_sources(
        toml_text: Option<&str>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileSettings = match toml_text {
            Some(text) => toml::from_str(text)?,
            None => FileSettings::default(),
        };

        let (listen_setting, listen_text) = match (var(ENV_LISTEN), file.listen) {
            (Some(v), _) => (ENV_LISTEN, v),
            (None, Some(v)) => (FILE_LISTEN, v),
            (None, None) => (FILE_LISTEN, DEFAULT_LISTEN.to_string()),
        };
        let listen = listen_text
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(listen_setting, &listen_text, e))?;

        let backend = match var(ENV_BACKEND) {
            Some(v) => v
                .parse::<BackendKind>()
                .map_err(|e| ConfigError::invalid(ENV_BACKEND, &v, e))?,
            None => file.backend.unwrap_or_default(),
        };

        let queue_capacity = match var(ENV_QUEUE_CAPACITY) {
            Some(v) => match v.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(ENV_QUEUE_CAPACITY, &v, ZERO_CAPACITY));
                }
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid(ENV_QUEUE_CAPACITY, &v, e)),
            },
            None => match file.queue_capacity {
                Some(0) => {
                    return Err(ConfigError::invalid(FILE_QUEUE_CAPACITY, "0", ZERO_CAPACITY));
                }
                Some(n) => n,
                None => DEFAULT_QUEUE_CAPACITY,
            },
        };

        let gap_policy = match var(ENV_GAP_POLICY) {
            Some(v) => v
                .parse::<GapPolicy>()
                .map_err(|e| ConfigError::invalid(ENV_GAP_POLICY, &v, e))?,
            None => file.gap_policy.unwrap_or_default(),
        };

        Ok(Self {
            listen,
            backend,
            log_file: var(ENV_LOG_FILE)
                .map(PathBuf::from)
                .or(file.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            db_path: var(ENV_DB_PATH)
                .map(PathBuf::from)
                .or(file.db_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            queue_capacity,
            gap_policy,
            daemon_log: var(ENV_DAEMON_LOG)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or(file.daemon_log),
        })
    }

    /// Storage settings for the selected backend
    pub fn logger_config(&self) -> LoggerConfig {
        match self.backend {
            BackendKind::File => {
                LoggerConfig::File(FileConfig::new(&self.log_file).gap_policy(self.gap_policy))
            }
            BackendKind::Sqlite => LoggerConfig::Sqlite(SqliteConfig::new(&self.db_path)),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
