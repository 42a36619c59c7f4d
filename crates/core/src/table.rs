// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory key-value table
//!
//! Rebuilt from the transaction log at startup and mutated by live requests
//! afterwards. Never persisted directly.

use crate::event::{Event, EventKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;

/// Errors returned by table operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("no such key: {0}")]
    NoSuchKey(String),
    #[error("key must not be empty")]
    EmptyKey,
}

/// Key-value map behind a single read/write lock
#[derive(Debug, Default)]
pub struct Table {
    entries: RwLock<HashMap<String, String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for a key
    pub fn put(&self, key: &str, value: &str) -> Result<(), TableError> {
        if key.is_empty() {
            return Err(TableError::EmptyKey);
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Look up a key; an absent key is `TableError::NoSuchKey`
    pub fn get(&self, key: &str) -> Result<String, TableError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| TableError::NoSuchKey(key.to_string()))
    }

    /// Remove a key. Removing an absent key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), TableError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    /// Apply a replayed event
    pub fn apply(&self, event: &Event) -> Result<(), TableError> {
        match event.kind {
            EventKind::Put => self.put(&event.key, &event.value),
            EventKind::Delete => self.delete(&event.key),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
