// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kv-daemon: HTTP front end for the kvapi key-value store
//!
//! Replays the transaction log into a table at startup, then serves
//! `PUT`/`GET`/`DELETE /v1/{key}` while logging every mutation.

pub mod config;
pub mod lifecycle;
pub mod server;

pub use config::{BackendKind, Config, ConfigError};
pub use lifecycle::{startup, Daemon, LifecycleError};
pub use server::{router, AppState};
