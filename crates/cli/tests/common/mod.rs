// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for CLI integration tests.

#![allow(dead_code)]

use kv_core::{Backend, Mutation};
use kv_storage::{FileBackend, FileConfig, Record, SqliteBackend, SqliteConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// put a=1, put b=2, delete a
pub fn sample_history() -> Vec<Mutation> {
    vec![
        Mutation::put("a", "1"),
        Mutation::put("b", "2"),
        Mutation::delete("a"),
    ]
}

/// Write `mutations` through the file backend; returns the log path
pub fn seed_file_log(dir: &TempDir, mutations: &[Mutation]) -> PathBuf {
    let path = dir.path().join("transaction.log");
    let mut backend = FileBackend::open(&FileConfig::new(&path)).expect("open file log");
    for mutation in mutations {
        backend.append(mutation).expect("append");
    }
    backend.release().expect("release");
    path
}

/// Write `mutations` through the sqlite backend; returns the database path
pub fn seed_sqlite_db(dir: &TempDir, mutations: &[Mutation]) -> PathBuf {
    let path = dir.path().join("kvapi.db");
    let mut backend = SqliteBackend::open(&SqliteConfig::new(&path)).expect("open database");
    for mutation in mutations {
        backend.append(mutation).expect("append");
    }
    backend.release().expect("release");
    path
}

/// Append a record whose sequence skips ahead, breaking the chain
pub fn append_gap(path: &Path, sequence: u64) {
    use std::io::Write;

    let line = Record::new(&Mutation::put("late", "x").sequenced(sequence))
        .to_line()
        .expect("encode record");
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open log");
    writeln!(file, "{}", line).expect("append line");
}
