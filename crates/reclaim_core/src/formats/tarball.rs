//! Tar walking and entry-by-entry salvage, optionally inside gzip.

use crate::error::{CoreError, Result};
use crate::formats::archive::SalvageStats;
use flate2::read::{GzDecoder, MultiGzDecoder};
use std::io::{self, Read, Write};
use tar::{Archive, Builder};

fn unwrapped<'a, R: Read + 'a>(reader: R, gzip: bool) -> Box<dyn Read + 'a> {
    if gzip {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    }
}

/// Reads every entry to at least its declared size and, for gzip input,
/// the stream to its trailer so the CRC is checked. Returns the entry count.
pub fn walk_tar<R: Read>(reader: R, gzip: bool) -> Result<usize> {
    let mut archive = Archive::new(unwrapped(reader, gzip));
    let mut entries = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let expected = entry.size();
        let read = io::copy(&mut entry, &mut io::sink())?;
        if read < expected {
            return Err(CoreError::invalid(format!(
                "tar entry {} ends after {read} of {expected} bytes",
                String::from_utf8_lossy(&entry.path_bytes())
            )));
        }
        entries += 1;
    }
    io::copy(&mut archive.into_inner(), &mut io::sink())?;
    Ok(entries)
}

/// Decompresses a whole gzip stream, every member, returning the
/// decompressed length.
pub fn inflate_gzip<R: Read>(reader: R) -> Result<u64> {
    Ok(io::copy(&mut MultiGzDecoder::new(reader), &mut io::sink())?)
}

/// Copies every entry that reads back in full into a new, uncompressed tar.
///
/// A short or failing entry is skipped; the first header that cannot be
/// parsed ends the walk. Errors finishing the output are fatal.
pub fn salvage_tar<R: Read, W: Write>(reader: R, gzip: bool, writer: W) -> Result<SalvageStats> {
    let mut archive = Archive::new(unwrapped(reader, gzip));
    let mut output = Builder::new(writer);
    let mut stats = SalvageStats::default();

    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(error = %e, "tar stream unreadable");
            stats.truncated = true;
            output.into_inner()?;
            return Ok(stats);
        }
    };

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, kept = stats.kept, "tar stream ended early");
                stats.truncated = true;
                break;
            }
        };
        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let mut header = entry.header().clone();
        let expected = entry.size();

        let mut data = Vec::new();
        match entry.read_to_end(&mut data) {
            Ok(n) if n as u64 >= expected => {}
            Ok(n) => {
                tracing::debug!(entry = %path, read = n, expected, "skipping short tar entry");
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::debug!(entry = %path, error = %e, "skipping damaged tar entry");
                stats.skipped += 1;
                continue;
            }
        }

        match output.append_data(&mut header, &path, data.as_slice()) {
            Ok(()) => stats.kept += 1,
            Err(e) => {
                tracing::debug!(entry = %path, error = %e, "tar entry cannot be rewritten");
                stats.skipped += 1;
            }
        }
    }

    output.into_inner()?;
    Ok(stats)
}
