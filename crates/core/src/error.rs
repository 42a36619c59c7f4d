// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised by transaction loggers and their backends

use std::io;
use thiserror::Error;

/// Errors that can occur while persisting or replaying events
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{backend} error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("corrupted record at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("checksum mismatch at line {line}")]
    ChecksumMismatch { line: u64 },
    #[error("sequence gap at line {line}: expected {expected}, found {found}")]
    SequenceGap { line: u64, expected: u64, found: u64 },
    #[error("sequence {found} does not follow {previous}")]
    OutOfOrder { previous: u64, found: u64 },
    #[error("unknown event kind: {0}")]
    UnknownEventKind(u8),
    #[error("event key must not be empty")]
    EmptyKey,
    #[error("logger is not running")]
    NotRunning,
    #[error("logger is already running")]
    AlreadyRunning,
    #[error("logger is closed")]
    Closed,
    #[error("writer stopped after an earlier failure")]
    WriterStopped,
    #[error("logger poisoned: {0}")]
    Poisoned(String),
    #[error("writer task failed: {0}")]
    WriterPanicked(String),
}

impl LogError {
    /// Wrap a backend-specific failure that has no dedicated variant
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        LogError::Backend {
            backend,
            message: err.to_string(),
        }
    }

    /// True if this error means the stored history itself is damaged
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LogError::Corrupted { .. }
                | LogError::ChecksumMismatch { .. }
                | LogError::SequenceGap { .. }
                | LogError::OutOfOrder { .. }
                | LogError::UnknownEventKind(_)
        )
    }
}
