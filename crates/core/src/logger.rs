// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction logger contract
//!
//! Every durable backend exposes the same capability set: enqueue writes,
//! replay history, surface asynchronous failures and shut down cleanly.
//! The replay driver and request handlers only ever see this trait.

use crate::error::LogError;
use crate::event::Event;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Replay output: the ordered event history plus a parallel error path
///
/// Both receivers close once history has been fully delivered or the first
/// unrecoverable read error has been reported.
#[derive(Debug)]
pub struct EventStream {
    pub events: mpsc::Receiver<Event>,
    pub errors: mpsc::Receiver<LogError>,
}

/// Durable, asynchronously written log of key mutations
#[async_trait]
pub trait TransactionLogger: Send + Sync {
    /// Backend name, for diagnostics
    fn backend(&self) -> &'static str;

    /// Enqueue a put. Waits only while the queue is full.
    ///
    /// Success means the event was queued, not that it is durable. Write
    /// failures surface through [`TransactionLogger::err`].
    async fn write_put(&self, key: &str, value: &str) -> Result<(), LogError>;

    /// Enqueue a delete, with the same contract as `write_put`
    async fn write_delete(&self, key: &str) -> Result<(), LogError>;

    /// Start the background writer. Call once, after replay.
    fn run(&mut self) -> Result<(), LogError>;

    /// Stream every persisted event in ascending sequence order
    ///
    /// Only meaningful before `run`; the scan happens on a background task.
    fn read_events(&self) -> EventStream;

    /// Take the receiver for post-`run` write failures
    ///
    /// The channel holds a single error: the writer stops after its first
    /// failure. Returns `None` once the receiver has been handed out.
    fn err(&self) -> Option<mpsc::Receiver<LogError>>;

    /// Drain the queue, wait for the writer and release the medium
    ///
    /// Every event enqueued before this call has been written, or a write
    /// error has been reported, by the time it returns.
    async fn close(&self) -> Result<(), LogError>;
}
