use crate::error::{CoreError, Result};
use lofty::file::AudioFile;
use lofty::probe::Probe;
use std::io::{Read, Seek};
use std::time::Duration;

/// Parses container metadata and returns the reported duration.
///
/// lofty reports an unknown duration as zero, so zero is a failure.
pub fn probe_duration<R: Read + Seek>(reader: R) -> Result<Duration> {
    let tagged = Probe::new(reader).guess_file_type()?.read()?;
    match tagged.properties().duration() {
        Duration::ZERO => Err(CoreError::invalid("audio duration unknown")),
        duration => Ok(duration),
    }
}
