// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model for the transaction log
//!
//! A `Mutation` is what request handlers enqueue. The backend turns it into
//! an `Event` by assigning the next sequence number at persistence time.

use crate::error::LogError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation recorded by an event
///
/// Encoded as a small integer both in file records and in the
/// `event_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EventKind {
    Delete = 1,
    Put = 2,
}

impl From<EventKind> for u8 {
    fn from(kind: EventKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for EventKind {
    type Error = LogError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventKind::Delete),
            2 => Ok(EventKind::Put),
            other => Err(LogError::UnknownEventKind(other)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Delete => write!(f, "delete"),
            EventKind::Put => write!(f, "put"),
        }
    }
}

/// A mutation waiting in the outbound queue, not yet sequenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub kind: EventKind,
    pub key: String,
    pub value: String,
}

impl Mutation {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Deletes carry no value
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Attach the sequence number assigned by the backend
    pub fn sequenced(self, sequence: u64) -> Event {
        Event {
            sequence,
            kind: self.kind,
            key: self.key,
            value: self.value,
        }
    }
}

/// One durable mutation of a single key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing, assigned by the backend when persisted
    pub sequence: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub key: String,
    /// Empty for deletes
    #[serde(default)]
    pub value: String,
}

impl Event {
    pub fn is_put(&self) -> bool {
        self.kind == EventKind::Put
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Put => write!(f, "{}\tput\t{}\t{}", self.sequence, self.key, self.value),
            EventKind::Delete => write!(f, "{}\tdelete\t{}", self.sequence, self.key),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
