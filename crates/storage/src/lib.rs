// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable backends for the kvapi transaction log
//!
//! - `file`: newline-delimited records in an append-only file (full history)
//! - `sqlite`: one row per live key, upserted on put (latest value only)

pub mod config;
pub mod file;
pub mod record;
pub mod sqlite;

pub use config::{open, open_read_only, FileConfig, GapPolicy, LoggerConfig, SqliteConfig};
pub use file::{FileBackend, FileReader, FileTransactionLogger};
pub use record::Record;
pub use sqlite::{SqliteBackend, SqliteReader, SqliteTransactionLogger};
