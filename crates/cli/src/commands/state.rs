// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kvctl state` - replay a log and print the resulting table

use anyhow::Result;
use clap::Args;
use kv_core::{replay, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::source::LogArgs;
use crate::output::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(flatten)]
    pub log: LogArgs,
}

/// Replayed table, sorted by key
#[derive(Serialize)]
#[serde(transparent)]
struct Snapshot(BTreeMap<String, String>);

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}\t{}", key, value)?;
        }
        Ok(())
    }
}

pub async fn state(args: StateArgs) -> Result<()> {
    let mut logger = args.log.open()?;
    let table = Table::new();

    let replayed = replay(logger.as_mut(), &table).await;
    logger.close().await?;
    let summary = replayed?;

    let snapshot = Snapshot(table.snapshot());
    if !(snapshot.0.is_empty() && args.log.format == OutputFormat::Text) {
        output::print(&snapshot, args.log.format)?;
    }
    eprintln!("{} keys from {} events", snapshot.0.len(), summary.events);
    Ok(())
}
