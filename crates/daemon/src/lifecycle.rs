// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::sync::Arc;

use kv_core::{replay, LogError, ReplayError, ReplaySummary, Table, TransactionLogger};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::server::AppState;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to open transaction log: {0}")]
    Open(#[source] LogError),

    #[error("Replay failed, refusing to start: {0}")]
    Replay(#[from] ReplayError),

    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Transaction log failed: {0}")]
    Logger(#[from] LogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation
pub struct Daemon {
    pub table: Arc<Table>,
    pub logger: Arc<dyn TransactionLogger>,
    /// What replay restored
    pub summary: ReplaySummary,
    errors: Option<mpsc::Receiver<LogError>>,
}

impl Daemon {
    /// Shared state for request handlers
    pub fn app_state(&self) -> AppState {
        AppState {
            table: Arc::clone(&self.table),
            logger: Arc::clone(&self.logger),
        }
    }

    /// Take the writer's failure channel; `None` after the first call
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<LogError>> {
        self.errors.take()
    }

    /// Drain pending writes and release the medium
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        info!(backend = self.logger.backend(), "Shutting down daemon...");
        self.logger.close().await?;
        info!(entries = self.table.len(), "Daemon shutdown complete");
        Ok(())
    }
}

/// Open the configured log, replay it and start the writer
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    let logger = kv_storage::open(&config.logger_config(), config.queue_capacity)
        .map_err(LifecycleError::Open)?;
    start(logger).await
}

/// Replay `logger` into a fresh table and start its writer
///
/// On replay failure the logger is closed and nothing is returned.
pub async fn start(mut logger: Box<dyn TransactionLogger>) -> Result<Daemon, LifecycleError> {
    let table = Table::new();

    let summary = match replay(logger.as_mut(), &table).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(backend = logger.backend(), error = %e, "replay failed");
            if matches!(&e, ReplayError::Log(log_err) if log_err.is_corruption()) {
                warn!("stored history is damaged; set KVAPI_GAP_POLICY=truncate to discard the broken tail");
            }
            if let Err(close_err) = logger.close().await {
                warn!(error = %close_err, "failed to close transaction log after replay failure");
            }
            return Err(e.into());
        }
    };

    info!(
        backend = logger.backend(),
        events = summary.events,
        last_sequence = ?summary.last_sequence,
        entries = table.len(),
        "Loaded state"
    );

    let errors = logger.err();
    Ok(Daemon {
        table: Arc::new(table),
        logger: Arc::from(logger),
        summary,
        errors,
    })
}

/// Resolve once the writer reports a failure
///
/// Pending forever when there is no channel or it closes cleanly, so it can
/// sit in a `select!` next to the signal handlers.
pub async fn writer_failure(errors: Option<mpsc::Receiver<LogError>>) -> LogError {
    if let Some(mut errors) = errors {
        if let Some(err) = errors.recv().await {
            return err;
        }
    }
    std::future::pending().await
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
