//! Stream-level format operations: bounded structural probes and the
//! transforms used by repair strategies.
//!
//! Everything here works on plain `Read`/`Seek`/`Write` values and never
//! touches storage directly.

pub mod archive;
pub mod audio;
pub mod generic;
pub mod image;
pub mod pdf;
pub mod tarball;
pub mod video;

use std::io::{Seek, SeekFrom};

/// Length of a seekable stream, leaving the cursor at the start.
pub fn stream_len<S: Seek + ?Sized>(stream: &mut S) -> std::io::Result<u64> {
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(len)
}
