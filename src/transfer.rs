//! Write, verify, commit.
//!
//! Every artifact the engine produces is first written under a provisional
//! name, durably flushed, checked by reading it back, and only then renamed
//! to its final name. Nothing incomplete is ever visible under a final name;
//! the worst residue of an interrupted run is an orphaned provisional file.

use crate::config::EngineConfig;
use reclaim_core::{CoreError, Handle, Storage, WriteStream};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{self, ErrorKind, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("source unreadable: {0}")]
    SourceUnreadable(#[source] CoreError),

    #[error("destination not writable: {0}")]
    Destination(#[source] CoreError),

    #[error("digest mismatch: wrote {written}, read back {read_back}")]
    DigestMismatch { written: String, read_back: String },

    #[error("I/O error during transfer: {0}")]
    Io(#[from] io::Error),

    #[error("could not commit {name}: {source}")]
    Commit { name: String, source: CoreError },
}

/// A committed artifact whose bytes were verified by an independent read-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transferred {
    pub handle: Handle,
    pub name: String,
    pub bytes: u64,
    pub sha256: String,
}

/// An artifact being written under its provisional name.
///
/// Dropping a `Staged` that was not committed deletes the provisional file.
pub(crate) struct Staged<'a> {
    storage: &'a dyn Storage,
    part: Handle,
    final_name: String,
    dest_dir: Handle,
    committed: bool,
}

impl<'a> Staged<'a> {
    /// Clears any previous artifact under the final name (last write wins)
    /// and any stale provisional file, then creates a fresh provisional one.
    pub(crate) fn begin(
        storage: &'a dyn Storage,
        config: &EngineConfig,
        dest_dir: &Handle,
        final_name: &str,
        mime_hint: &str,
    ) -> Result<Self, TransferError> {
        let part_name = config.partial_name(final_name);
        for name in [final_name, part_name.as_str()] {
            if let Some(existing) = storage
                .find_child(dest_dir, name)
                .map_err(TransferError::Destination)?
            {
                tracing::debug!(name, "removing existing destination entry");
                storage.delete(&existing).map_err(TransferError::Destination)?;
            }
        }
        let part = storage
            .create_writable(dest_dir, &part_name, mime_hint)
            .map_err(TransferError::Destination)?;

        Ok(Self {
            storage,
            part,
            final_name: final_name.to_string(),
            dest_dir: dest_dir.clone(),
            committed: false,
        })
    }

    pub(crate) fn part(&self) -> &Handle {
        &self.part
    }

    pub(crate) fn open_write(&self) -> Result<Box<dyn WriteStream>, TransferError> {
        self.storage
            .open_write(&self.part)
            .map_err(TransferError::Destination)
    }

    pub(crate) fn open_read_back(&self) -> Result<Box<dyn reclaim_core::ByteStream>, TransferError> {
        self.storage
            .open_read(&self.part)
            .map_err(TransferError::Destination)
    }

    /// Atomically renames the provisional artifact to its final name.
    pub(crate) fn commit(mut self) -> Result<Handle, TransferError> {
        let handle = self
            .storage
            .rename(&self.part, &self.final_name)
            .map_err(|source| TransferError::Commit {
                name: self.final_name.clone(),
                source,
            })?;
        self.committed = true;
        tracing::debug!(dir = %self.dest_dir, name = %self.final_name, "committed artifact");
        Ok(handle)
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.storage.delete(&self.part) {
            tracing::warn!(part = %self.part, error = %e, "could not remove provisional artifact");
        }
    }
}

/// Streams `reader` to `writer`, returning the byte count and hex SHA-256 of
/// what was read.
pub(crate) fn copy_with_digest<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }
    Ok((total, hex::encode(hasher.finalize())))
}

/// Hex SHA-256 and length of everything `reader` yields.
pub fn sha256_of<R: Read + ?Sized>(reader: &mut R, buffer_size: usize) -> io::Result<(u64, String)> {
    copy_with_digest(reader, &mut io::sink(), buffer_size)
}

/// The write, verify, commit protocol over a [`Storage`].
pub struct VerifiedCopy<'a> {
    storage: &'a dyn Storage,
    config: &'a EngineConfig,
}

impl<'a> VerifiedCopy<'a> {
    pub fn new(storage: &'a dyn Storage, config: &'a EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Copies the bytes behind `src` into `dest_dir` under `name`.
    pub fn copy(&self, src: &Handle, dest_dir: &Handle, name: &str) -> Result<Transferred, TransferError> {
        let mut reader = self
            .storage
            .open_read(src)
            .map_err(TransferError::SourceUnreadable)?;
        self.write_from(&mut *reader, dest_dir, name, "application/octet-stream")
    }

    /// Writes everything `reader` yields into `dest_dir` under `name`.
    pub fn write_from<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        dest_dir: &Handle,
        name: &str,
        mime_hint: &str,
    ) -> Result<Transferred, TransferError> {
        let staged = Staged::begin(self.storage, self.config, dest_dir, name, mime_hint)?;

        let (bytes, written) = {
            let mut out = staged.open_write()?;
            let copied = copy_with_digest(reader, &mut *out, self.config.copy_buffer_size)?;
            out.flush()?;
            out.sync_all()?;
            copied
        };

        let mut back = staged.open_read_back()?;
        let (read_bytes, read_back) = sha256_of(&mut *back, self.config.copy_buffer_size)?;
        drop(back);

        if read_bytes != bytes || read_back != written {
            tracing::warn!(name, %written, %read_back, "read-back digest mismatch, discarding");
            return Err(TransferError::DigestMismatch { written, read_back });
        }

        let handle = staged.commit()?;
        Ok(Transferred {
            handle,
            name: name.to_string(),
            bytes,
            sha256: written,
        })
    }
}
