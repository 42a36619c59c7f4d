// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Which transaction log a command reads

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use kv_core::TransactionLogger;
use kv_storage::{FileConfig, LoggerConfig, SqliteConfig};
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    File,
    Sqlite,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Backend that wrote the log
    #[arg(long, value_enum, default_value = "file")]
    pub backend: BackendArg,

    /// Log file or database path
    #[arg(long)]
    pub path: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl LogArgs {
    /// Open the log read-only; a missing path is an error, not an empty log
    pub fn open(&self) -> Result<Box<dyn TransactionLogger>> {
        if !self.path.exists() {
            bail!("no transaction log at {}", self.path.display());
        }
        let config = match self.backend {
            BackendArg::File => LoggerConfig::File(FileConfig::new(&self.path)),
            BackendArg::Sqlite => LoggerConfig::Sqlite(SqliteConfig {
                path: self.path.clone(),
                create_if_missing: false,
            }),
        };
        Ok(kv_storage::open_read_only(&config)?)
    }
}
