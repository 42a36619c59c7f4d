// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup replay: rebuild the table from the log, then go live
//!
//! The driver races the event and error streams, applies events in delivery
//! order and switches the logger into running mode whatever the outcome.
//! A replay error is fatal to startup: a store that could not replay its
//! whole history must not serve traffic.

use crate::error::LogError;
use crate::event::Event;
use crate::logger::{EventStream, TransactionLogger};
use crate::table::{Table, TableError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort startup replay
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read transaction log: {0}")]
    Log(#[from] LogError),
    #[error("failed to apply event {sequence}: {source}")]
    Table {
        sequence: u64,
        #[source]
        source: TableError,
    },
}

/// Outcome of a successful replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Number of events applied
    pub events: u64,
    /// Highest sequence seen, if any
    pub last_sequence: Option<u64>,
}

impl ReplaySummary {
    fn record(&mut self, event: &Event) {
        self.events += 1;
        self.last_sequence = Some(event.sequence);
    }
}

/// Replay the logger's history into `table`, then start the logger
pub async fn replay<L>(logger: &mut L, table: &Table) -> Result<ReplaySummary, ReplayError>
where
    L: TransactionLogger + ?Sized,
{
    let backend = logger.backend();
    info!(backend, "replaying transaction log");

    let result = apply_stream(logger.read_events(), table).await;

    // Go live even after a failure; the caller decides whether to serve
    logger.run()?;

    match &result {
        Ok(summary) => info!(
            backend,
            events = summary.events,
            last_sequence = ?summary.last_sequence,
            "replay complete"
        ),
        Err(e) => warn!(backend, error = %e, "replay failed"),
    }
    result
}

async fn apply_stream(stream: EventStream, table: &Table) -> Result<ReplaySummary, ReplayError> {
    let EventStream {
        mut events,
        mut errors,
    } = stream;
    let mut summary = ReplaySummary::default();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => apply(table, &event, &mut summary)?,
                None => {
                    // History is delivered; an error may still be in flight
                    return match errors.recv().await {
                        Some(e) => Err(e.into()),
                        None => Ok(summary),
                    };
                }
            },
            error = errors.recv() => match error {
                Some(e) => {
                    // Apply what was delivered before the break, then report
                    while let Ok(event) = events.try_recv() {
                        apply(table, &event, &mut summary)?;
                    }
                    return Err(e.into());
                }
                None => {
                    while let Some(event) = events.recv().await {
                        apply(table, &event, &mut summary)?;
                    }
                    return Ok(summary);
                }
            },
        }
    }
}

fn apply(table: &Table, event: &Event, summary: &mut ReplaySummary) -> Result<(), ReplayError> {
    debug!(sequence = event.sequence, kind = %event.kind, key = %event.key, "applying event");
    table.apply(event).map_err(|source| ReplayError::Table {
        sequence: event.sequence,
        source,
    })?;
    summary.record(event);
    Ok(())
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
