// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued writer shared by every backend
//!
//! ```text
//! write_put/write_delete → bounded queue → writer task → Backend::append → medium
//!                                                           ↓ (first failure)
//!                                                     error channel (1 slot)
//! ```
//!
//! A single writer task consumes the queue in FIFO order, so the sequence
//! a backend assigns at dequeue time matches enqueue order.

use crate::error::LogError;
use crate::event::{Event, Mutation};
use crate::logger::{EventStream, TransactionLogger};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// A durable medium the queued writer persists into
///
/// Implementations do blocking I/O; they are only driven from blocking
/// tasks.
pub trait Backend: Send + 'static {
    /// Name used in logs and error messages
    const NAME: &'static str;

    /// Capacity of the event handoff during replay
    const REPLAY_BUFFER: usize;

    /// Iterator over persisted history, in ascending sequence order
    type Reader: Iterator<Item = Result<Event, LogError>> + Send + 'static;

    /// Prepare a history scan. The scan itself happens while iterating.
    fn reader(&self) -> Result<Self::Reader, LogError>;

    /// Persist one mutation, returning the sequence it was stored under
    fn append(&mut self, mutation: &Mutation) -> Result<Option<u64>, LogError>;

    /// Flush and release the medium
    fn release(self) -> Result<(), LogError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

enum State<B> {
    Idle {
        backend: B,
        errors: mpsc::Sender<LogError>,
    },
    Running {
        queue: mpsc::Sender<Mutation>,
        writer: JoinHandle<Result<(), LogError>>,
    },
    Closed,
}

/// How the one shutdown of a logger ended
type Outcome = Result<(), Arc<LogError>>;

/// `TransactionLogger` over any `Backend`
pub struct QueuedLogger<B: Backend> {
    capacity: usize,
    state: Mutex<State<B>>,
    errors: Mutex<Option<mpsc::Receiver<LogError>>>,
    /// Set once the medium is released; every `close` caller waits on it
    closed: Arc<watch::Sender<Option<Outcome>>>,
}

impl<B: Backend> QueuedLogger<B> {
    pub fn new(backend: B) -> Self {
        Self::with_capacity(backend, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a logger whose queue holds at most `capacity` pending events
    pub fn with_capacity(backend: B, capacity: usize) -> Self {
        let (errors_tx, errors_rx) = mpsc::channel(1);
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State::Idle {
                backend,
                errors: errors_tx,
            }),
            errors: Mutex::new(Some(errors_rx)),
            closed: Arc::new(watch::channel(None).0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events enqueued but not yet taken by the writer
    pub fn pending(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            State::Running { queue, .. } => queue.max_capacity() - queue.capacity(),
            _ => 0,
        }
    }

    async fn enqueue(&self, mutation: Mutation) -> Result<(), LogError> {
        if mutation.key.is_empty() {
            return Err(LogError::EmptyKey);
        }
        let queue = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &*state {
                State::Running { queue, .. } => queue.clone(),
                State::Idle { .. } => return Err(LogError::NotRunning),
                State::Closed => return Err(LogError::Closed),
            }
        };
        queue
            .send(mutation)
            .await
            .map_err(|_| LogError::WriterStopped)
    }
}

#[async_trait]
impl<B: Backend> TransactionLogger for QueuedLogger<B> {
    fn backend(&self) -> &'static str {
        B::NAME
    }

    async fn write_put(&self, key: &str, value: &str) -> Result<(), LogError> {
        self.enqueue(Mutation::put(key, value)).await
    }

    async fn write_delete(&self, key: &str) -> Result<(), LogError> {
        self.enqueue(Mutation::delete(key)).await
    }

    fn run(&mut self) -> Result<(), LogError> {
        let handle = Handle::try_current().map_err(|e| LogError::backend(B::NAME, e))?;
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());

        match std::mem::replace(state, State::Closed) {
            State::Idle { backend, errors } => {
                let (queue, rx) = mpsc::channel(self.capacity);
                let writer = handle.spawn_blocking(move || write_loop(backend, rx, errors));
                *state = State::Running { queue, writer };
                info!(backend = B::NAME, capacity = self.capacity, "transaction log running");
                Ok(())
            }
            running @ State::Running { .. } => {
                *state = running;
                Err(LogError::AlreadyRunning)
            }
            State::Closed => Err(LogError::Closed),
        }
    }

    fn read_events(&self) -> EventStream {
        let (events_tx, events) = mpsc::channel(B::REPLAY_BUFFER.max(1));
        let (errors_tx, errors) = mpsc::channel(1);

        let reader = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &*state {
                State::Idle { backend, .. } => backend.reader(),
                State::Running { .. } => Err(LogError::AlreadyRunning),
                State::Closed => Err(LogError::Closed),
            }
        };

        let reader = match (reader, Handle::try_current()) {
            (Ok(reader), Ok(handle)) => (reader, handle),
            (Err(e), _) => {
                let _ = errors_tx.try_send(e);
                return EventStream { events, errors };
            }
            (Ok(_), Err(e)) => {
                let _ = errors_tx.try_send(LogError::backend(B::NAME, e));
                return EventStream { events, errors };
            }
        };

        let (reader, handle) = reader;
        handle.spawn_blocking(move || {
            let mut delivered = 0u64;
            for item in reader {
                match item {
                    Ok(event) => {
                        if events_tx.blocking_send(event).is_err() {
                            debug!(backend = B::NAME, "replay consumer went away");
                            return;
                        }
                        delivered += 1;
                    }
                    Err(e) => {
                        error!(backend = B::NAME, delivered, error = %e, "replay aborted");
                        let _ = errors_tx.blocking_send(e);
                        return;
                    }
                }
            }
            debug!(backend = B::NAME, delivered, "replay scan finished");
        });

        EventStream { events, errors }
    }

    fn err(&self) -> Option<mpsc::Receiver<LogError>> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    async fn close(&self) -> Result<(), LogError> {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &*state {
                State::Closed => None,
                _ => Some(std::mem::replace(&mut *state, State::Closed)),
            }
        };
        let mut done = self.closed.subscribe();

        match previous {
            Some(State::Idle { backend, .. }) => {
                let outcome = backend.release().map_err(Arc::new);
                info!(backend = B::NAME, "transaction log closed before running");
                self.closed.send_replace(Some(outcome));
            }
            Some(State::Running { queue, writer }) => {
                let pending = queue.max_capacity() - queue.capacity();
                info!(backend = B::NAME, pending, "draining transaction log");
                // Writer exits once every sender, including in-flight writes, is gone
                drop(queue);
                // Detached so the drain completes even if this caller is cancelled
                let closed = Arc::clone(&self.closed);
                tokio::spawn(async move {
                    let outcome = match writer.await {
                        Ok(result) => result.map_err(Arc::new),
                        Err(e) => Err(Arc::new(LogError::WriterPanicked(e.to_string()))),
                    };
                    if outcome.is_ok() {
                        info!(backend = B::NAME, "transaction log closed");
                    }
                    closed.send_replace(Some(outcome));
                });
            }
            Some(State::Closed) | None => {}
        }

        let outcome = match done.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(reissue::<B>(&e)),
            None => Err(LogError::WriterStopped),
        }
    }
}

/// Rebuild a shared close failure for one more caller
fn reissue<B: Backend>(err: &LogError) -> LogError {
    match err {
        LogError::Poisoned(reason) => LogError::Poisoned(reason.clone()),
        LogError::WriterPanicked(reason) => LogError::WriterPanicked(reason.clone()),
        LogError::Io(e) => LogError::Io(std::io::Error::new(e.kind(), e.to_string())),
        other => LogError::backend(B::NAME, other),
    }
}

fn write_loop<B: Backend>(
    mut backend: B,
    mut queue: mpsc::Receiver<Mutation>,
    errors: mpsc::Sender<LogError>,
) -> Result<(), LogError> {
    while let Some(mutation) = queue.blocking_recv() {
        match backend.append(&mutation) {
            Ok(sequence) => debug!(
                backend = B::NAME,
                kind = %mutation.kind,
                key = %mutation.key,
                ?sequence,
                "event persisted"
            ),
            Err(e) => {
                error!(
                    backend = B::NAME,
                    key = %mutation.key,
                    error = %e,
                    "write failed, logger is poisoned"
                );
                let reason = e.to_string();
                let _ = errors.try_send(e);
                return Err(LogError::Poisoned(reason));
            }
        }
    }
    backend.release()
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
