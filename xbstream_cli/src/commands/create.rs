// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Create Command
//!
//! Archives input files concurrently: one tokio task per input, each
//! streaming its file through a producer obtained from the shared
//! [`Writer`]. The writer's emission lock keeps the chunks of concurrent
//! producers atomic in the output stream.
//!
//! The first failing task aborts the whole archive; a partially written
//! archive is undefined and the caller should discard it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio::task::JoinSet;
use tracing::{debug, info};

use xbstream::Writer;

use crate::commands::format_bytes;

/// Output sink shared by the archive-file and stdout modes.
pub type ArchiveSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Read granularity for input files. The producer's 10 MiB buffer does the
/// coalescing; this only bounds per-read memory.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Creates an archive containing every input file.
pub async fn run(output: Option<PathBuf>, inputs: Vec<PathBuf>) -> Result<()> {
    let sink: ArchiveSink = match &output {
        Some(path) => Box::new(File::create(path).await.with_context(|| {
            format!("failed to create archive {}", path.display())
        })?),
        None => Box::new(tokio::io::stdout()),
    };

    let writer = Writer::new(sink);
    let mut tasks = JoinSet::new();
    for input in inputs {
        let writer = writer.clone();
        tasks.spawn(async move {
            let bytes = archive_file(&writer, &input).await?;
            Ok::<_, anyhow::Error>((input, bytes))
        });
    }

    let mut files = 0usize;
    let mut total = 0u64;
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(|e| anyhow!("archiver task failed: {}", e))? {
            Ok((input, bytes)) => {
                info!(file = %input.display(), size = %format_bytes(bytes), "archived");
                files += 1;
                total += bytes;
            }
            Err(err) => {
                // First producer error aborts the archive
                tasks.abort_all();
                return Err(err);
            }
        }
    }

    writer.close().await.context("failed to close archive sink")?;
    info!(files, total = %format_bytes(total), "archive complete");
    Ok(())
}

/// Gets the supplied path's raw bytes for verbatim storage.
///
/// The stored path is opaque bytes on the wire; going through `str` would
/// rewrite non-UTF-8 OS paths with U+FFFD.
#[cfg(unix)]
fn stored_path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

/// Gets the supplied path's bytes for storage.
///
/// Non-Unix OS strings have no byte representation; lossy UTF-8 is the
/// closest stored form.
#[cfg(not(unix))]
fn stored_path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Streams one input file into the archive through its own producer.
async fn archive_file(writer: &Writer<ArchiveSink>, input: &PathBuf) -> Result<u64> {
    let mut source = File::open(input)
        .await
        .with_context(|| format!("failed to open input {}", input.display()))?;

    let stored = stored_path_bytes(input);
    let mut file = writer
        .create(&stored)
        .with_context(|| format!("cannot store path {}", input.display()))?;

    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = source
            .read(&mut buffer)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?;
        if n == 0 {
            break;
        }
        file.write(&buffer[..n]).await?;
        total += n as u64;
    }

    file.close().await?;
    debug!(file = %input.display(), bytes = total, "producer finished");
    Ok(total)
}
