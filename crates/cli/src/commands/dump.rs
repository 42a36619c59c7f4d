// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kvctl dump` - print every persisted event

use anyhow::{bail, Result};
use clap::Args;
use kv_core::EventStream;

use super::source::LogArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn dump(args: DumpArgs) -> Result<()> {
    let logger = args.log.open()?;

    let EventStream {
        mut events,
        mut errors,
    } = logger.read_events();
    let mut history = Vec::new();
    while let Some(event) = events.recv().await {
        history.push(event);
    }
    let failure = errors.recv().await;
    logger.close().await?;

    output::print_list(&history, args.log.format)?;

    if let Some(e) = failure {
        bail!("log unreadable after {} events: {}", history.len(), e);
    }
    Ok(())
}
