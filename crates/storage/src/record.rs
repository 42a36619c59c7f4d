// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File record with checksum verification
//!
//! One JSON object per line, fields in order: `sequence`, `type`, `key`,
//! `value`, `checksum`. The CRC32 covers the first four fields.

use kv_core::{Event, EventKind, LogError};
use serde::{Deserialize, Serialize};

/// A single line of the file-backed transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub sequence: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub checksum: u32,
}

impl Record {
    /// Build a record with computed checksum
    pub fn new(event: &Event) -> Self {
        Self {
            sequence: event.sequence,
            kind: event.kind,
            key: event.key.clone(),
            value: event.value.clone(),
            checksum: checksum(event.sequence, event.kind, &event.key, &event.value),
        }
    }

    /// Verify the checksum matches the payload
    pub fn verify(&self) -> bool {
        self.checksum == checksum(self.sequence, self.kind, &self.key, &self.value)
    }

    /// Serialize to a single line (no trailing newline)
    pub fn to_line(&self) -> Result<String, LogError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a single line
    pub fn from_line(line: &str) -> Result<Self, LogError> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn into_event(self) -> Event {
        Event {
            sequence: self.sequence,
            kind: self.kind,
            key: self.key,
            value: self.value,
        }
    }
}

fn checksum(sequence: u64, kind: EventKind, key: &str, value: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&[u8::from(kind)]);
    // Length prefix keeps ("ab", "c") and ("a", "bc") apart
    hasher.update(&(key.len() as u64).to_le_bytes());
    hasher.update(key.as_bytes());
    hasher.update(value.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
