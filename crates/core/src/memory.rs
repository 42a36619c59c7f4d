// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::error::LogError;
use crate::event::{Event, Mutation};
use crate::writer::{Backend, QueuedLogger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Logger over the in-memory backend
pub type MemoryLogger = QueuedLogger<MemoryBackend>;

/// Backend keeping history in a shared vector
///
/// Clones share the same history, so a test can hand one clone to a logger,
/// keep another, and "restart" by building a new logger from it.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    events: Arc<Mutex<Vec<Event>>>,
    fail_writes_after: Option<usize>,
    fail_replay_after: Option<usize>,
    paused: Arc<(Mutex<bool>, Condvar)>,
    released: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with history
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Arc::new(Mutex::new(events)),
            ..Self::default()
        }
    }

    /// Accept `count` more writes, then fail every append
    pub fn fail_writes_after(mut self, count: usize) -> Self {
        let stored = self.len();
        self.fail_writes_after = Some(stored + count);
        self
    }

    /// Deliver `count` events during replay, then report corruption
    pub fn fail_replay_after(mut self, count: usize) -> Self {
        self.fail_replay_after = Some(count);
        self
    }

    /// Block the writer until `resume` is called
    pub fn pause(&self) {
        let (lock, _) = &*self.paused;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    pub fn resume(&self) {
        let (lock, cvar) = &*self.paused;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = false;
        cvar.notify_all();
    }

    /// Everything persisted so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once a logger released this backend
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn wait_while_paused(&self) {
        let (lock, cvar) = &*self.paused;
        let mut paused = lock.lock().unwrap_or_else(|e| e.into_inner());
        while *paused {
            paused = cvar.wait(paused).unwrap_or_else(|e| e.into_inner());
        }
    }
}

impl Backend for MemoryBackend {
    const NAME: &'static str = "memory";
    const REPLAY_BUFFER: usize = 1;
    type Reader = std::vec::IntoIter<Result<Event, LogError>>;

    fn reader(&self) -> Result<Self::Reader, LogError> {
        let mut items: Vec<_> = self.events().into_iter().map(Ok).collect();
        if let Some(limit) = self.fail_replay_after {
            items.truncate(limit);
            items.push(Err(LogError::Corrupted {
                line: limit as u64 + 1,
                reason: "injected replay failure".to_string(),
            }));
        }
        Ok(items.into_iter())
    }

    fn append(&mut self, mutation: &Mutation) -> Result<Option<u64>, LogError> {
        self.wait_while_paused();

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if self.fail_writes_after.is_some_and(|limit| events.len() >= limit) {
            return Err(LogError::Io(std::io::Error::other("injected write failure")));
        }
        let sequence = events.last().map_or(1, |e| e.sequence + 1);
        events.push(mutation.clone().sequenced(sequence));
        Ok(Some(sequence))
    }

    fn release(self) -> Result<(), LogError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}
