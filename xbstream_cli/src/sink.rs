// /////////////////////////////////////////////////////////////////////////////
// XBStream RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Sink
//!
//! The consumer-side collaborator of the codec: turns verified chunks into
//! files on disk. The codec hands over a path, a payload offset, and the
//! payload bytes; this module owns everything filesystem-shaped - opening
//! destination files, creating parent directories, positioned writes, and
//! closing handles when a file's EOF chunk arrives.
//!
//! Stored paths are materialized under a root directory. Leading root and
//! prefix components are dropped so an absolute stored path still lands
//! under the root; beyond that, stored paths are used as-is (the format
//! promises no canonicalization and the archiver performs none).

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Component, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace};

use xbstream::StreamError;

/// Destination for decoded chunks, keyed by stored path.
///
/// One `write_payload` call per payload chunk, one `finish_file` call per
/// EOF chunk; `finish` closes the sink and reports the paths that never
/// received their EOF chunk.
#[async_trait]
pub trait ChunkSink: Send {
    /// Writes one payload at its offset within the destination file.
    async fn write_payload(
        &mut self,
        path: &[u8],
        offset: u64,
        payload: &[u8],
    ) -> Result<(), StreamError>;

    /// Closes the destination for a path, creating it empty if no payload
    /// chunk preceded the EOF chunk.
    async fn finish_file(&mut self, path: &[u8]) -> Result<(), StreamError>;

    /// Flushes everything and returns the stored paths still open - files
    /// whose EOF chunk never arrived.
    async fn finish(&mut self) -> Result<Vec<String>, StreamError>;
}

/// Converts stored path bytes to a native path, byte for byte.
///
/// Stored paths are opaque bytes on the wire; decoding through `str` would
/// rewrite non-UTF-8 names on disk.
#[cfg(unix)]
fn stored_to_native(path: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(path))
}

/// Converts stored path bytes to a native path.
///
/// Non-Unix paths cannot carry arbitrary bytes; lossy UTF-8 is the closest
/// native form.
#[cfg(not(unix))]
fn stored_to_native(path: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(path).into_owned())
}

/// [`ChunkSink`] that materializes files beneath a root directory.
pub struct FilesystemSink {
    root: PathBuf,
    open: HashMap<Vec<u8>, File>,
}

impl FilesystemSink {
    /// Creates a sink rooted at the given output directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: HashMap::new(),
        }
    }

    /// Maps a stored path to its destination under the root.
    fn destination(&self, path: &[u8]) -> PathBuf {
        let relative: PathBuf = stored_to_native(path)
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.root.join(relative)
    }

    async fn open_destination(&self, path: &[u8]) -> Result<File, StreamError> {
        let destination = self.destination(path);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StreamError::io_error(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                )))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&destination)
            .await
            .map_err(|e| {
                StreamError::io_error(format!("failed to open {}: {}", destination.display(), e))
            })?;
        debug!(destination = %destination.display(), "opened destination file");
        Ok(file)
    }
}

#[async_trait]
impl ChunkSink for FilesystemSink {
    async fn write_payload(
        &mut self,
        path: &[u8],
        offset: u64,
        payload: &[u8],
    ) -> Result<(), StreamError> {
        if !self.open.contains_key(path) {
            let file = self.open_destination(path).await?;
            self.open.insert(path.to_vec(), file);
        }
        let file = self
            .open
            .get_mut(path)
            .ok_or_else(|| StreamError::internal_error("destination handle vanished"))?;

        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(payload).await?;
        trace!(
            path = %String::from_utf8_lossy(path),
            offset,
            len = payload.len(),
            "committed payload chunk"
        );
        Ok(())
    }

    async fn finish_file(&mut self, path: &[u8]) -> Result<(), StreamError> {
        match self.open.remove(path) {
            Some(mut file) => {
                file.flush().await?;
            }
            None => {
                // EOF with no preceding payload chunk: an empty file
                drop(self.open_destination(path).await?);
            }
        }
        debug!(path = %String::from_utf8_lossy(path), "finished file");
        Ok(())
    }

    async fn finish(&mut self) -> Result<Vec<String>, StreamError> {
        let mut unterminated: Vec<String> = Vec::new();
        for (path, mut file) in self.open.drain() {
            file.flush().await?;
            unterminated.push(String::from_utf8_lossy(&path).into_owned());
        }
        unterminated.sort();
        Ok(unterminated)
    }
}
