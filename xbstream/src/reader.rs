// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Archive Reader
//!
//! This module provides the sequential, single-consumer side of the codec:
//! [`Reader`] parses chunks one at a time from any `AsyncRead` source and
//! exposes each payload as a bounded stream over the same source.
//!
//! ## Overview
//!
//! The reader provides:
//!
//! - **Exact framing**: every header field is read with exact-length
//!   semantics; a short read anywhere inside a chunk is a `Truncated`
//!   error, never a silent stop.
//! - **Graceful termination**: end-of-stream is only reported when the
//!   source is exhausted precisely at a chunk boundary, before any magic
//!   byte.
//! - **Streaming payloads**: payload bytes are never buffered whole; the
//!   caller drains a [`PayloadReader`] bounded to the declared length.
//! - **Offset diagnostics**: framing errors carry the absolute stream
//!   offset where parsing failed.
//!
//! ## Consumption Contract
//!
//! The payload of each chunk must be fully consumed before the next call to
//! [`Reader::next_chunk`]; advancing with pending bytes is a
//! `PayloadNotConsumed` error. Callers that want to skip a payload call
//! [`Reader::discard_payload`] explicitly.
//!
//! ## Checksums
//!
//! The reader surfaces the stored CRC-32 on the chunk descriptor but never
//! verifies it. Verification requires owning the payload bytes, and the
//! reader hands those to the caller untouched so they can be forwarded
//! zero-copy.
//!
//! ## Usage
//!
//! ```no_run
//! use tokio::io::AsyncReadExt;
//! use xbstream::{Reader, StreamError};
//!
//! async fn list(source: impl tokio::io::AsyncRead + Unpin) -> Result<(), StreamError> {
//!     let mut reader = Reader::new(source);
//!     while let Some(chunk) = reader.next_chunk().await? {
//!         println!("{} ({:?})", chunk.path_lossy(), chunk.chunk_type);
//!         let mut payload = Vec::new();
//!         reader.payload().read_to_end(&mut payload).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tracing::trace;

use crate::error::StreamError;
use crate::format::{
    ChunkFlags, ChunkHeader, ChunkType, PayloadHeader, CHUNK_MAGIC, MAX_PATH_LENGTH,
};

/// Streaming chunk parser over a sequential byte source.
///
/// The reader is single-threaded by design: one consumer advances it chunk
/// by chunk. It is not restartable after an error; once framing is lost
/// there is no way to resynchronize on the stream.
pub struct Reader<R> {
    source: R,
    /// Absolute offset into the stream, maintained for error reporting.
    offset: u64,
    /// Unconsumed payload bytes of the most recently parsed chunk.
    remaining: u64,
}

impl<R: AsyncRead + Unpin> Reader<R> {
    /// Wraps a sequential byte source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            offset: 0,
            remaining: 0,
        }
    }

    /// Parses and returns the next chunk header.
    ///
    /// Returns `Ok(None)` when the source ends exactly at a chunk boundary;
    /// that is the only graceful termination. End-of-stream anywhere inside
    /// a chunk is reported as `Truncated`.
    ///
    /// # Errors
    ///
    /// - `PayloadNotConsumed` if the previous chunk's payload was not fully
    ///   drained (see [`Reader::discard_payload`]).
    /// - `BadMagic`, `Truncated`, `UnknownChunkType`, `PathLenOutOfRange`
    ///   on framing violations.
    /// - `IoError` for underlying source failures.
    pub async fn next_chunk(&mut self) -> Result<Option<ChunkHeader>, StreamError> {
        if self.remaining > 0 {
            return Err(StreamError::PayloadNotConsumed(self.remaining));
        }

        let mut magic = [0u8; CHUNK_MAGIC.len()];
        let mut filled = 0;
        while filled < magic.len() {
            let n = self
                .source
                .read(&mut magic[filled..])
                .await
                .map_err(|e| StreamError::IoError(e.to_string()))?;
            if n == 0 {
                if filled == 0 {
                    // Source exhausted on a chunk boundary: end of archive.
                    return Ok(None);
                }
                return Err(StreamError::Truncated {
                    offset: self.offset + filled as u64,
                    context: "chunk magic",
                });
            }
            filled += n;
        }
        if magic != CHUNK_MAGIC {
            return Err(StreamError::BadMagic { offset: self.offset });
        }
        self.offset += CHUNK_MAGIC.len() as u64;

        let flags = ChunkFlags::new(self.read_u8("chunk flags").await?);
        let type_byte = self.read_u8("chunk type").await?;
        let chunk_type = ChunkType::from_wire(type_byte);
        if let ChunkType::Unknown(value) = chunk_type {
            // The format carries no length for unknown chunk types, so they
            // cannot be skipped over, ignorable flag or not.
            return Err(StreamError::UnknownChunkType {
                value,
                offset: self.offset - 1,
            });
        }

        let path_len = self.read_u32_le("path length").await?;
        if path_len == 0 || path_len as usize > MAX_PATH_LENGTH {
            return Err(StreamError::PathLenOutOfRange(path_len));
        }
        let mut path = vec![0u8; path_len as usize];
        self.read_exact(&mut path, "chunk path").await?;

        let payload = if chunk_type.is_payload() {
            let length = self.read_u64_le("payload length").await?;
            let offset = self.read_u64_le("payload offset").await?;
            let checksum = self.read_u32_le("payload checksum").await?;
            self.remaining = length;
            Some(PayloadHeader {
                length,
                offset,
                checksum,
            })
        } else {
            None
        };

        trace!(
            path = %String::from_utf8_lossy(&path),
            chunk_type = ?chunk_type,
            payload_len = payload.map(|p| p.length).unwrap_or(0),
            "parsed chunk header"
        );

        Ok(Some(ChunkHeader {
            flags,
            chunk_type,
            path,
            payload,
        }))
    }

    /// Gets a bounded reader over the current chunk's payload.
    ///
    /// The view yields exactly the unconsumed payload bytes of the chunk
    /// most recently returned by [`Reader::next_chunk`]; for EOF chunks it
    /// is empty. Dropping the view does not consume anything.
    pub fn payload(&mut self) -> PayloadReader<'_, R> {
        PayloadReader { reader: self }
    }

    /// Gets the number of payload bytes not yet consumed.
    pub fn pending_payload(&self) -> u64 {
        self.remaining
    }

    /// Reads the current payload to its end and discards it.
    ///
    /// Returns the number of bytes thrown away. This is the explicit
    /// opt-out from the consumption contract for callers that do not care
    /// about a chunk's content.
    pub async fn discard_payload(&mut self) -> Result<u64, StreamError> {
        let mut scratch = [0u8; 8 * 1024];
        let mut discarded = 0u64;
        while self.remaining > 0 {
            let take = self.remaining.min(scratch.len() as u64) as usize;
            let n = self
                .source
                .read(&mut scratch[..take])
                .await
                .map_err(|e| StreamError::IoError(e.to_string()))?;
            if n == 0 {
                return Err(StreamError::Truncated {
                    offset: self.offset,
                    context: "chunk payload",
                });
            }
            self.remaining -= n as u64;
            self.offset += n as u64;
            discarded += n as u64;
        }
        Ok(discarded)
    }

    /// Unwraps the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    async fn read_exact(
        &mut self,
        buf: &mut [u8],
        context: &'static str,
    ) -> Result<(), StreamError> {
        self.source.read_exact(buf).await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                StreamError::Truncated {
                    offset: self.offset,
                    context,
                }
            } else {
                StreamError::IoError(e.to_string())
            }
        })?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    async fn read_u8(&mut self, context: &'static str) -> Result<u8, StreamError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf, context).await?;
        Ok(buf[0])
    }

    async fn read_u32_le(&mut self, context: &'static str) -> Result<u32, StreamError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf, context).await?;
        Ok(u32::from_le_bytes(buf))
    }

    async fn read_u64_le(&mut self, context: &'static str) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf, context).await?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Bounded view over the current chunk's payload.
///
/// Implements `AsyncRead`, yielding at most the declared payload length
/// from the underlying source. Reaching the underlying end-of-stream while
/// payload bytes are still owed is an `UnexpectedEof` I/O error, because a
/// declared-length payload can never legitimately end early.
pub struct PayloadReader<'a, R> {
    reader: &'a mut Reader<R>,
}

impl<R> PayloadReader<'_, R> {
    /// Gets the number of payload bytes this view will still yield.
    pub fn remaining(&self) -> u64 {
        self.reader.remaining
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for PayloadReader<'_, R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.reader.remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let limit = me.reader.remaining.min(buf.remaining() as u64) as usize;
        let mut sub = ReadBuf::new(buf.initialize_unfilled_to(limit));
        ready!(Pin::new(&mut me.reader.source).poll_read(cx, &mut sub))?;

        let n = sub.filled().len();
        if n == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "source ended with {} payload bytes outstanding",
                    me.reader.remaining
                ),
            )));
        }
        me.reader.remaining -= n as u64;
        me.reader.offset += n as u64;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}
