// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection and construction

use crate::file::FileBackend;
use crate::sqlite::SqliteBackend;
use kv_core::{LogError, QueuedLogger, TransactionLogger};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// What the file backend does when its history is broken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Report the break during replay; startup fails
    #[default]
    Abort,
    /// Cut the file back to the last intact record when opening
    Truncate,
}

#[derive(Debug, Error)]
#[error("unknown gap policy: {0} (expected \"abort\" or \"truncate\")")]
pub struct UnknownGapPolicy(pub String);

impl FromStr for GapPolicy {
    type Err = UnknownGapPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(GapPolicy::Abort),
            "truncate" => Ok(GapPolicy::Truncate),
            _ => Err(UnknownGapPolicy(s.to_string())),
        }
    }
}

/// File backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub path: PathBuf,
    pub gap_policy: GapPolicy,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gap_policy: GapPolicy::default(),
        }
    }

    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }
}

/// SQLite backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: PathBuf,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: true,
        }
    }
}

/// Which durable backend to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerConfig {
    File(FileConfig),
    Sqlite(SqliteConfig),
}

impl LoggerConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            LoggerConfig::File(_) => "file",
            LoggerConfig::Sqlite(_) => "sqlite",
        }
    }
}

/// Construct the configured logger
///
/// Fails if the medium cannot be opened or reached; no logger is returned
/// in that case.
pub fn open(
    config: &LoggerConfig,
    queue_capacity: usize,
) -> Result<Box<dyn TransactionLogger>, LogError> {
    let logger: Box<dyn TransactionLogger> = match config {
        LoggerConfig::File(file) => {
            info!(path = %file.path.display(), gap_policy = ?file.gap_policy, "opening file transaction log");
            Box::new(QueuedLogger::with_capacity(
                FileBackend::open(file)?,
                queue_capacity,
            ))
        }
        LoggerConfig::Sqlite(sqlite) => {
            info!(path = %sqlite.path.display(), "opening sqlite transaction log");
            Box::new(QueuedLogger::with_capacity(
                SqliteBackend::open(sqlite)?,
                queue_capacity,
            ))
        }
    };
    Ok(logger)
}

/// Open an existing log for inspection only
///
/// The medium is never created, repaired or migrated, and any write through
/// the returned logger fails.
pub fn open_read_only(config: &LoggerConfig) -> Result<Box<dyn TransactionLogger>, LogError> {
    let logger: Box<dyn TransactionLogger> = match config {
        LoggerConfig::File(file) => Box::new(QueuedLogger::with_capacity(
            FileBackend::open_read_only(&file.path)?,
            1,
        )),
        LoggerConfig::Sqlite(sqlite) => Box::new(QueuedLogger::with_capacity(
            SqliteBackend::open_read_only(&sqlite.path)?,
            1,
        )),
    };
    Ok(logger)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
