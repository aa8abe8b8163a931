// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent Archive Writer
//!
//! This module provides the many-producer side of the codec: a [`Writer`]
//! that owns the output sink, and per-file [`FileWriter`] producers that
//! buffer, checksum, and emit chunks through it.
//!
//! ## Overview
//!
//! The writer provides:
//!
//! - **Chunk-atomic emission**: one lock guards the sink, and every
//!   header-plus-payload pair is written inside a single critical section.
//!   Chunks from concurrent producers interleave freely in the archive, but
//!   never inside each other.
//! - **Coalescing buffers**: each producer accumulates small writes into a
//!   10 MiB buffer; a write that no longer fits flushes the buffer and then
//!   passes through verbatim as its own chunk, so a large write is never
//!   re-buffered.
//! - **Per-file offset bookkeeping**: payload offsets start at zero and are
//!   densely packed; the offset is stamped under the emission lock so it
//!   always matches the order the producer's chunks reach the sink.
//! - **CRC-32 integrity**: each payload is hashed (CRC-32/IEEE) before the
//!   lock is taken, keeping checksum work out of the serialized section.
//!
//! ## Lock Discipline
//!
//! The only shared state is the sink behind `tokio::sync::Mutex`. The
//! critical section of a payload chunk spans from the first header byte to
//! the last payload byte; the critical section of an EOF chunk is its
//! header write. Nothing else in a producer is shared, so producers for
//! different files (or even the same file) never coordinate beyond taking
//! turns on the sink.
//!
//! ## Failure Semantics
//!
//! Any sink error is surfaced to the calling producer and the archive must
//! be considered unrecoverable; no internal retry is attempted. A producer
//! dropped without [`FileWriter::close`] leaves its file without an EOF
//! chunk, which consumers treat as archive-level truncation.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::StreamError;
use crate::format::{
    CHUNK_MAGIC, CHUNK_TYPE_EOF, CHUNK_TYPE_PAYLOAD, MAX_PATH_LENGTH, MIN_CHUNK_SIZE,
};

/// Shared archive writer owning the output sink.
///
/// Cheap to clone; clones share the same sink and emission lock. Producers
/// created from any clone serialize their chunks through that lock.
pub struct Writer<W> {
    sink: Arc<Mutex<W>>,
}

impl<W> Clone for Writer<W> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    /// Wraps an output sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Starts a new logical file within the archive.
    ///
    /// The returned producer owns its path and buffer; any number of
    /// producers may be live at once. Producers for the same path are not
    /// rejected, but the resulting archive is semantically undefined.
    ///
    /// # Errors
    ///
    /// - `PathTooLong` if the path exceeds 512 bytes.
    /// - `PathLenOutOfRange` if the path is empty; the wire format requires
    ///   at least one path byte per chunk.
    pub fn create(&self, path: impl AsRef<[u8]>) -> Result<FileWriter<W>, StreamError> {
        let path = path.as_ref();
        if path.len() > MAX_PATH_LENGTH {
            return Err(StreamError::PathTooLong(path.len()));
        }
        if path.is_empty() {
            return Err(StreamError::PathLenOutOfRange(0));
        }

        debug!(path = %String::from_utf8_lossy(path), "created archive producer");

        Ok(FileWriter {
            sink: Arc::clone(&self.sink),
            path: path.to_vec(),
            buffer: Vec::with_capacity(MIN_CHUNK_SIZE),
            offset: 0,
        })
    }

    /// Flushes and shuts down the underlying sink.
    ///
    /// All producers must have been closed first; the archive ends after
    /// the last producer's EOF chunk, with no trailer.
    pub async fn close(self) -> Result<(), StreamError> {
        let mut sink = self.sink.lock().await;
        sink.flush().await?;
        sink.shutdown().await?;
        debug!("archive writer closed");
        Ok(())
    }

    /// Unwraps the writer, returning the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` if any producer (or clone) still shares the
    /// sink.
    pub fn into_inner(self) -> Result<W, StreamError> {
        Arc::try_unwrap(self.sink)
            .map(Mutex::into_inner)
            .map_err(|_| StreamError::internal_error("sink is still shared by live producers"))
    }
}

/// Per-file producer handle.
///
/// Appends bytes to one logical file of the archive, emitting payload
/// chunks through the shared emission lock and exactly one EOF chunk on
/// [`FileWriter::close`].
#[derive(Debug)]
pub struct FileWriter<W> {
    sink: Arc<Mutex<W>>,
    path: Vec<u8>,
    buffer: Vec<u8>,
    offset: u64,
}

impl<W: AsyncWrite + Unpin> FileWriter<W> {
    /// Appends bytes to the logical file.
    ///
    /// Data smaller than the remaining buffer space is coalesced; anything
    /// else flushes the buffer and is emitted directly as its own chunk, so
    /// emitted chunks can exceed the 10 MiB coalescing target when a single
    /// write does.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let free = MIN_CHUNK_SIZE - self.buffer.len();
        if data.len() < free {
            self.buffer.extend_from_slice(data);
            return Ok(data.len());
        }

        self.flush().await?;
        self.emit_payload(data).await?;
        Ok(data.len())
    }

    /// Emits the buffered bytes as a single chunk; no-op when empty.
    pub async fn flush(&mut self) -> Result<(), StreamError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let buffered = std::mem::take(&mut self.buffer);
        let result = self.emit_payload(&buffered).await;
        self.buffer = buffered;
        self.buffer.clear();
        result
    }

    /// Flushes pending bytes and terminates the file with its EOF chunk.
    ///
    /// Consuming `self` makes a second close unrepresentable; exactly one
    /// EOF chunk is written per producer.
    pub async fn close(mut self) -> Result<(), StreamError> {
        self.flush().await?;
        self.emit_eof().await?;
        debug!(
            path = %String::from_utf8_lossy(&self.path),
            bytes = self.offset,
            "archive producer closed"
        );
        Ok(())
    }

    /// Gets the stored path of this logical file.
    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// Gets the number of payload bytes already emitted to the sink.
    ///
    /// Buffered-but-unflushed bytes are not counted.
    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    async fn emit_payload(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        // Checksum work stays outside the critical section.
        let checksum = crc32fast::hash(payload);

        let mut header =
            Vec::with_capacity(CHUNK_MAGIC.len() + 1 + 1 + 4 + self.path.len() + 8 + 8 + 4);
        header.extend_from_slice(&CHUNK_MAGIC);
        header.push(0); // flags
        header.push(CHUNK_TYPE_PAYLOAD);
        header.extend_from_slice(&(self.path.len() as u32).to_le_bytes());
        header.extend_from_slice(&self.path);
        header.extend_from_slice(&(payload.len() as u64).to_le_bytes());

        let mut sink = self.sink.lock().await;

        // The offset is stamped under the lock so this producer's dense
        // offset sequence matches the order its chunks reach the sink.
        header.extend_from_slice(&self.offset.to_le_bytes());
        header.extend_from_slice(&checksum.to_le_bytes());

        sink.write_all(&header).await?;
        sink.write_all(payload).await?;
        self.offset += payload.len() as u64;

        trace!(
            path = %String::from_utf8_lossy(&self.path),
            len = payload.len(),
            offset = self.offset,
            checksum,
            "emitted payload chunk"
        );

        Ok(())
    }

    async fn emit_eof(&mut self) -> Result<(), StreamError> {
        let mut header = Vec::with_capacity(CHUNK_MAGIC.len() + 1 + 1 + 4 + self.path.len());
        header.extend_from_slice(&CHUNK_MAGIC);
        header.push(0); // flags
        header.push(CHUNK_TYPE_EOF);
        header.extend_from_slice(&(self.path.len() as u32).to_le_bytes());
        header.extend_from_slice(&self.path);

        let mut sink = self.sink.lock().await;
        sink.write_all(&header).await?;
        Ok(())
    }
}
