// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! clap-derive surface of the archiver. Kept free of any I/O so the
//! structure can be round-tripped in tests with `Cli::try_parse_from`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xbstream")]
#[command(about = "XBStream RS - concurrent chunked archiver")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an archive from one or more input files
    Create {
        /// Output archive file (defaults to standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input file paths; each supplied path is stored verbatim
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },

    /// Extract every file of an archive into a directory
    Extract {
        /// Input archive file (defaults to standard input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory; parent directories are created as needed
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}
