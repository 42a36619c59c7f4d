// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kvctl - inspect kvapi transaction logs offline

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dump, state};

#[derive(Parser)]
#[command(
    name = "kvctl",
    version,
    about = "Inspect kvapi transaction logs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every persisted event in sequence order
    Dump(dump::DumpArgs),
    /// Replay the log and print the resulting key/value table
    State(state::StateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    match cli.command {
        Commands::Dump(args) => dump::dump(args).await,
        Commands::State(args) => state::state(args).await,
    }
}

/// Storage warnings (damaged logs) go to stderr; `RUST_LOG` overrides
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
