use crate::error::Result;
use std::io::Read;

/// Loads the document structure and counts its pages.
pub fn page_count<R: Read>(reader: R) -> Result<usize> {
    let document = lopdf::Document::load_from(reader)?;
    Ok(document.get_pages().len())
}
