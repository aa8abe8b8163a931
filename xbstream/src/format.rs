// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Format Definitions
//!
//! This module defines the on-the-wire layout of an xbstream chunk together
//! with the constants and descriptor types shared by the reader and writer.
//!
//! ## Overview
//!
//! An xbstream archive is a flat sequence of chunks with no archive-level
//! header or trailer. Every chunk starts with the same fixed prelude:
//!
//! ```text
//! +--------+-------+------+----------+------------+
//! | Magic  | Flags | Type | PathLen  | Path       |
//! | 8      | 1     | 1    | 4 (LE)   | PathLen    |
//! +--------+-------+------+----------+------------+
//! ```
//!
//! Payload chunks (`Type == 'P'`) continue with:
//!
//! ```text
//! +------------+------------+----------+------------+
//! | PayLen     | PayOffset  | Checksum | Payload    |
//! | 8 (LE)     | 8 (LE)     | 4 (LE)   | PayLen     |
//! +------------+------------+----------+------------+
//! ```
//!
//! EOF chunks (`Type == 'E'`) end at the path; they carry no payload fields
//! at all.
//!
//! ## Endianness
//!
//! All integer fields are little-endian. The magic and the path are raw byte
//! sequences. The path's encoding and separator conventions are opaque to
//! the codec; interpretation belongs to the consumer.
//!
//! ## Size Constants
//!
//! - **Minimum chunk size (10 MiB)**: the coalescing target of the per-file
//!   producer buffer, not an enforced bound on emitted chunks. A single
//!   large write produces a larger chunk; the final flush before close
//!   usually produces a smaller one.
//! - **Maximum path length (512)**: hard bound, enforced on both the create
//!   and the parse side.

use std::borrow::Cow;

/// Fixed 8-byte literal that marks the start of every chunk.
pub const CHUNK_MAGIC: [u8; 8] = *b"XBSTCK01";

/// Capacity of the per-file producer buffer (10 MiB).
///
/// This is a coalescing target: emitted chunks may be larger (oversized
/// single writes pass through verbatim) or smaller (the final flush).
pub const MIN_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Maximum length, in bytes, of a stored file path.
pub const MAX_PATH_LENGTH: usize = 512;

/// Flag bit marking a chunk as skippable by consumers that do not
/// understand its type.
pub const FLAG_CHUNK_IGNORABLE: u8 = 0x01;

/// Wire byte for a payload chunk.
pub const CHUNK_TYPE_PAYLOAD: u8 = b'P';

/// Wire byte for an end-of-file chunk.
pub const CHUNK_TYPE_EOF: u8 = b'E';

/// Classified chunk type.
///
/// Any wire byte other than `'P'` or `'E'` is preserved as `Unknown`; the
/// format defines no way to compute the extent of an unknown chunk, so the
/// reader treats those as fatal (see [`crate::reader::Reader`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Carries a slice of a logical file's content.
    Payload,
    /// Terminates a logical file; no payload fields follow the path.
    Eof,
    /// Unrecognized wire byte, preserved verbatim.
    Unknown(u8),
}

impl ChunkType {
    /// Classifies a wire type byte.
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            CHUNK_TYPE_PAYLOAD => ChunkType::Payload,
            CHUNK_TYPE_EOF => ChunkType::Eof,
            other => ChunkType::Unknown(other),
        }
    }

    /// Returns the wire byte for this type.
    pub fn as_wire(&self) -> u8 {
        match self {
            ChunkType::Payload => CHUNK_TYPE_PAYLOAD,
            ChunkType::Eof => CHUNK_TYPE_EOF,
            ChunkType::Unknown(other) => *other,
        }
    }

    /// Checks whether this is a payload chunk.
    pub fn is_payload(&self) -> bool {
        matches!(self, ChunkType::Payload)
    }

    /// Checks whether this is an end-of-file chunk.
    pub fn is_eof(&self) -> bool {
        matches!(self, ChunkType::Eof)
    }
}

/// Chunk flag bitfield.
///
/// Only one bit is currently assigned (`0x01`, "ignorable"). Unassigned
/// bits are preserved so that a re-emitted chunk is byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkFlags(u8);

impl ChunkFlags {
    /// Wraps a raw flags byte.
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Gets the raw flags byte.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Checks whether the ignorable bit is set.
    pub fn is_ignorable(&self) -> bool {
        self.0 & FLAG_CHUNK_IGNORABLE != 0
    }
}

/// Payload-specific header fields of a chunk.
///
/// Present only for [`ChunkType::Payload`] chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Number of payload bytes following the header. Zero is valid.
    pub length: u64,
    /// Byte offset of this payload within its logical file.
    pub offset: u64,
    /// CRC-32/IEEE digest of the payload bytes.
    ///
    /// The reader surfaces this value but never verifies it; verification
    /// belongs to the consumer that owns the payload stream.
    pub checksum: u32,
}

/// Parsed header of a single chunk.
///
/// Yielded by the reader once per chunk; for payload chunks the payload
/// bytes themselves are delivered separately through a bounded stream so
/// they never have to be buffered whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Raw flag bits.
    pub flags: ChunkFlags,
    /// Classified chunk type.
    pub chunk_type: ChunkType,
    /// Stored file path, as raw bytes. Never empty, at most
    /// [`MAX_PATH_LENGTH`] bytes.
    pub path: Vec<u8>,
    /// Payload fields; `None` for EOF chunks.
    pub payload: Option<PayloadHeader>,
}

impl ChunkHeader {
    /// Gets the stored path as UTF-8, replacing invalid sequences.
    ///
    /// The wire format does not constrain the path encoding; this accessor
    /// exists for display and for consumers that key files by text paths.
    pub fn path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }

    /// Checks whether this chunk terminates its logical file.
    pub fn is_eof(&self) -> bool {
        self.chunk_type.is_eof()
    }

    /// Gets the declared payload length, or zero for EOF chunks.
    pub fn payload_length(&self) -> u64 {
        self.payload.map(|p| p.length).unwrap_or(0)
    }
}
