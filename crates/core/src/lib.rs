// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! kv-core: transaction-log core for the kvapi key-value store
//!
//! This crate provides:
//! - The event model (`Event`, `Mutation`, `EventKind`)
//! - The in-memory key-value `Table`
//! - The `TransactionLogger` contract and its queued writer (`QueuedLogger`)
//! - The startup replay driver that rebuilds a `Table` from a logger

pub mod error;
pub mod event;
pub mod logger;
pub mod replay;
pub mod table;
pub mod writer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::LogError;
pub use event::{Event, EventKind, Mutation};
pub use logger::{EventStream, TransactionLogger};
pub use replay::{replay, ReplayError, ReplaySummary};
pub use table::{Table, TableError};
pub use writer::{Backend, QueuedLogger, DEFAULT_QUEUE_CAPACITY};

#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBackend, MemoryLogger};
