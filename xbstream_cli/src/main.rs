// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # XBStream Archiver Entry Point
//!
//! Thin binary shell: parses arguments, wires the tracing subscriber, and
//! dispatches to the command layer. All diagnostics go to stderr because
//! standard output may be the archive byte stream itself (`create` with no
//! `-o`, `extract` reading a pipe).
//!
//! Exit status is 0 on success and 1 on any error, with the failure
//! reported through the subscriber before exiting.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use xbstream_cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("starting XBStream RS v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Create { output, input } => commands::create::run(output, input).await,
        Commands::Extract { input, output } => commands::extract::run(input, output).await,
    };

    if let Err(err) = result {
        error!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
