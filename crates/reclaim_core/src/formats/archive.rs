//! ZIP walking and entry-by-entry salvage.
//!
//! The central directory is the authority when it can be found. Entries that
//! keep their sizes in a trailing data descriptor can only be read that way.
//! When the directory is missing (a truncated download, a cut-off copy) the
//! local headers are walked in stream order instead.

use crate::error::Result;
use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Read, Seek, Write};
use zip::read::read_zipfile_from_stream;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Signature of the end-of-central-directory record; an archive with no
/// entries starts with it.
const EMPTY_ARCHIVE_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalvageStats {
    pub kept: usize,
    pub skipped: usize,
    /// The input ended or broke structurally before its central directory.
    pub truncated: bool,
}

/// Reads every entry fully so checksums are verified. Returns the entry
/// count.
pub fn walk_zip<R: Read + Seek>(mut reader: R) -> Result<usize> {
    if let Some(walked) = walk_central_directory(&mut reader) {
        return walked;
    }
    reader.rewind()?;
    walk_local_headers(reader)
}

/// `None` when no central directory could be located.
fn walk_central_directory<R: Read + Seek>(reader: &mut R) -> Option<Result<usize>> {
    let mut archive = match ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::debug!(error = %e, "no usable central directory, walking local headers");
            return None;
        }
    };
    Some(read_indexed(&mut archive))
}

fn read_indexed<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<usize> {
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        io::copy(&mut entry, &mut io::sink())?;
    }
    Ok(archive.len())
}

fn walk_local_headers<R: Read>(reader: R) -> Result<usize> {
    let mut reader = BufReader::new(reader);
    if starts_empty(&mut reader)? {
        return Ok(0);
    }
    let mut entries = 0;
    while let Some(mut entry) = read_zipfile_from_stream(&mut reader)? {
        io::copy(&mut entry, &mut io::sink())?;
        entries += 1;
    }
    Ok(entries)
}

/// Copies every entry that reads back cleanly into a new archive.
///
/// An entry failing mid-read is skipped and the walk moves on; a broken
/// stream structure ends the local-header walk. Errors on the output side
/// are fatal.
pub fn salvage_zip<R: Read + Seek, W: Write + Seek>(mut reader: R, writer: W) -> Result<SalvageStats> {
    let mut rebuilt = Rebuilt::new(writer);

    if !salvage_central_directory(&mut reader, &mut rebuilt)? {
        reader.rewind()?;
        let mut reader = BufReader::new(reader);
        if !starts_empty(&mut reader)? {
            salvage_local_headers(&mut reader, &mut rebuilt)?;
        }
    }

    rebuilt.finish()
}

/// Returns false, having written nothing, when no central directory could
/// be located.
fn salvage_central_directory<R: Read + Seek, W: Write + Seek>(
    reader: &mut R,
    rebuilt: &mut Rebuilt<W>,
) -> Result<bool> {
    let mut archive = match ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::debug!(error = %e, "no usable central directory, salvaging local headers");
            return Ok(false);
        }
    };

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                rebuilt.skip(&format!("#{index}"), &e);
                continue;
            }
        };
        let name = entry.name().to_string();
        if entry.is_dir() {
            rebuilt.keep_directory(name)?;
            continue;
        }
        let mut data = Vec::new();
        match entry.read_to_end(&mut data) {
            Ok(_) => rebuilt.keep_file(name, &data)?,
            Err(e) => rebuilt.skip(&name, &e),
        }
    }
    Ok(true)
}

fn salvage_local_headers<R: Read, W: Write + Seek>(reader: &mut R, rebuilt: &mut Rebuilt<W>) -> Result<()> {
    loop {
        let mut entry = match read_zipfile_from_stream(reader) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, kept = rebuilt.stats.kept, "archive stream ended early");
                rebuilt.stats.truncated = true;
                return Ok(());
            }
        };

        let name = entry.name().to_string();
        if entry.is_dir() {
            rebuilt.keep_directory(name)?;
            continue;
        }
        let mut data = Vec::new();
        match entry.read_to_end(&mut data) {
            Ok(_) => rebuilt.keep_file(name, &data)?,
            Err(e) => rebuilt.skip(&name, &e),
        }
    }
}

/// The output archive and its running tally.
struct Rebuilt<W: Write + Seek> {
    output: ZipWriter<W>,
    names: HashSet<String>,
    stats: SalvageStats,
}

impl<W: Write + Seek> Rebuilt<W> {
    fn new(writer: W) -> Self {
        Self {
            output: ZipWriter::new(writer),
            names: HashSet::new(),
            stats: SalvageStats::default(),
        }
    }

    fn claim(&mut self, name: &str) -> bool {
        if self.names.insert(name.to_string()) {
            return true;
        }
        self.skip(name, &"duplicate entry name");
        false
    }

    fn keep_directory(&mut self, name: String) -> Result<()> {
        if self.claim(&name) {
            self.output.add_directory(name, SimpleFileOptions::default())?;
            self.stats.kept += 1;
        }
        Ok(())
    }

    fn keep_file(&mut self, name: String, data: &[u8]) -> Result<()> {
        if self.claim(&name) {
            let large = data.len() as u64 >= u64::from(u32::MAX);
            self.output
                .start_file(name, SimpleFileOptions::default().large_file(large))?;
            self.output.write_all(data)?;
            self.stats.kept += 1;
        }
        Ok(())
    }

    fn skip(&mut self, name: &str, reason: &dyn std::fmt::Display) {
        tracing::debug!(entry = %name, error = %reason, "skipping damaged archive entry");
        self.stats.skipped += 1;
    }

    fn finish(self) -> Result<SalvageStats> {
        self.output.finish()?;
        Ok(self.stats)
    }
}

fn starts_empty<R: Read>(reader: &mut BufReader<R>) -> io::Result<bool> {
    Ok(reader.fill_buf()?.starts_with(&EMPTY_ARCHIVE_SIGNATURE))
}
