use crate::error::Result;
use std::io::{ErrorKind, Read};

/// Reads at most `limit` bytes and reports how many were readable.
pub fn bounded_read<R: Read>(mut reader: R, limit: usize) -> Result<usize> {
    let mut buffer = vec![0u8; limit.max(1)];
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
