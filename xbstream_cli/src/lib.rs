// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # XBStream Archiver
//!
//! Command-line companion to the `xbstream` codec crate. Two subcommands:
//!
//! - **create** - archive one or more input files, one concurrent producer
//!   per file, into a file or standard output.
//! - **extract** - demultiplex an archive from a file or standard input
//!   into a directory, verifying the per-chunk CRC before committing any
//!   byte to disk.
//!
//! The command layer is exposed as a library so the end-to-end test suites
//! can drive it without spawning subprocesses; `main.rs` stays a thin
//! entry point that parses arguments, wires the tracing subscriber to
//! stderr (standard output may be the archive itself), and maps failures
//! to a non-zero exit code.

pub mod cli;
pub mod commands;
pub mod sink;

pub use cli::{Cli, Commands};
