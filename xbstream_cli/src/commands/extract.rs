// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extract Command
//!
//! Demultiplexes an archive sequentially: each chunk's payload is drained
//! from the reader's bounded view, its CRC-32 recomputed and compared with
//! the stored checksum, and only then committed to the filesystem sink at
//! its payload offset. Any framing error, checksum mismatch, or missing
//! EOF chunk fails the extraction; partial output files are left on disk.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use xbstream::{ChunkType, Reader, StreamError};

use crate::commands::format_bytes;
use crate::sink::{ChunkSink, FilesystemSink};

/// Input source shared by the archive-file and stdin modes.
pub type ArchiveSource = Box<dyn AsyncRead + Send + Unpin>;

/// Extracts every file of an archive under the output directory.
pub async fn run(input: Option<PathBuf>, output_dir: PathBuf) -> Result<()> {
    let source: ArchiveSource = match &input {
        Some(path) => Box::new(File::open(path).await.with_context(|| {
            format!("failed to open archive {}", path.display())
        })?),
        None => Box::new(tokio::io::stdin()),
    };

    let mut sink = FilesystemSink::new(&output_dir);
    let (files, bytes) = extract_stream(Reader::new(source), &mut sink).await?;

    info!(
        files,
        total = %format_bytes(bytes),
        directory = %output_dir.display(),
        "extraction complete"
    );
    Ok(())
}

/// Drives a chunk reader into a sink, fail-fast on any error.
///
/// Split from [`run`] so the end-to-end tests can substitute sources and
/// sinks.
pub async fn extract_stream<R, S>(mut reader: Reader<R>, sink: &mut S) -> Result<(usize, u64)>
where
    R: AsyncRead + Unpin,
    S: ChunkSink,
{
    let mut files = 0usize;
    let mut bytes = 0u64;

    while let Some(chunk) = reader.next_chunk().await? {
        match chunk.chunk_type {
            ChunkType::Payload => {
                let info = chunk.payload.ok_or_else(|| {
                    StreamError::internal_error("payload chunk without payload fields")
                })?;

                // Preallocation is capped; read_to_end grows past it if a
                // chunk really is that large
                let mut payload =
                    Vec::with_capacity(info.length.min(64 * 1024 * 1024) as usize);
                reader
                    .payload()
                    .read_to_end(&mut payload)
                    .await
                    .with_context(|| {
                        format!("failed to read payload of {}", chunk.path_lossy())
                    })?;

                // Verify before any byte reaches the destination file
                let actual = crc32fast::hash(&payload);
                if actual != info.checksum {
                    return Err(StreamError::ChecksumMismatch {
                        path: chunk.path_lossy().into_owned(),
                        expected: info.checksum,
                        actual,
                    }
                    .into());
                }

                sink.write_payload(&chunk.path, info.offset, &payload).await?;
                bytes += payload.len() as u64;
            }
            ChunkType::Eof => {
                sink.finish_file(&chunk.path).await?;
                files += 1;
            }
            ChunkType::Unknown(value) => {
                bail!("reader yielded unknown chunk type {:#04x}", value);
            }
        }
    }

    let unterminated = sink.finish().await?;
    if !unterminated.is_empty() {
        bail!(
            "archive truncated: no EOF chunk for {}",
            unterminated.join(", ")
        );
    }

    Ok((files, bytes))
}
