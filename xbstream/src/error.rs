// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Error System
//!
//! Error taxonomy for the xbstream codec. Framing errors carry the absolute
//! stream offset at which parsing failed so corrupt archives can be
//! inspected with a hex dump.
//!
//! ## Error Categories
//!
//! - **Framing**: `BadMagic`, `Truncated`, `UnknownChunkType`,
//!   `PathLenOutOfRange` - the byte stream does not parse as chunks. Once
//!   framing is lost it cannot be safely recovered; the reader does not
//!   resynchronize.
//! - **Validation**: `PathTooLong` on the create side, `ChecksumMismatch`
//!   raised by consumers that verify payloads.
//! - **Contract**: `PayloadNotConsumed` - the caller advanced the reader
//!   while payload bytes of the previous chunk were still pending.
//! - **Infrastructure**: `IoError` from the underlying source or sink.

use thiserror::Error;

/// Errors produced by the xbstream codec and its consumers.
///
/// End-of-stream at a chunk boundary is *not* an error; the reader reports
/// it as the end of iteration.
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("bad chunk magic at stream offset {offset:#x}")]
    BadMagic { offset: u64 },

    #[error("truncated stream at offset {offset:#x} while reading {context}")]
    Truncated { offset: u64, context: &'static str },

    #[error("unknown chunk type {value:#04x} at stream offset {offset:#x}")]
    UnknownChunkType { value: u8, offset: u64 },

    #[error("chunk path length {0} outside the valid range 1..=512")]
    PathLenOutOfRange(u32),

    #[error("path length {0} exceeds the 512 byte maximum")]
    PathTooLong(usize),

    #[error("checksum mismatch for {path}: stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    #[error("payload not consumed: {0} bytes of the previous chunk remain")]
    PayloadNotConsumed(u64),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl StreamError {
    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error indicates corrupt or unparseable archive data
    /// rather than an environmental failure.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            StreamError::BadMagic { .. }
                | StreamError::Truncated { .. }
                | StreamError::UnknownChunkType { .. }
                | StreamError::PathLenOutOfRange(_)
                | StreamError::ChecksumMismatch { .. }
        )
    }

    /// Gets the error category for log labelling.
    pub fn category(&self) -> &'static str {
        match self {
            StreamError::IoError(_) => "io",
            StreamError::BadMagic { .. } => "framing",
            StreamError::Truncated { .. } => "framing",
            StreamError::UnknownChunkType { .. } => "framing",
            StreamError::PathLenOutOfRange(_) => "framing",
            StreamError::PathTooLong(_) => "validation",
            StreamError::ChecksumMismatch { .. } => "integrity",
            StreamError::PayloadNotConsumed(_) => "contract",
            StreamError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IoError(err.to_string())
    }
}
