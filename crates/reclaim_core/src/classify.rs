//! Name/mime based classification of recovered files.

use crate::types::Kind;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif", "avif", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "flac", "ogg", "opus"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "csv", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];

/// Maps a display name and an optional source-reported mime type to a [`Kind`].
///
/// A recognised media mime prefix (`image/`, `video/`, `audio/`) wins; any
/// other mime, including `application/*` and `text/*`, falls through to the
/// extension table. Pure and total.
#[must_use]
pub fn classify(name: &str, mime: Option<&str>) -> Kind {
    if let Some(kind) = mime.and_then(kind_from_mime) {
        return kind;
    }
    extension_of(name)
        .map(kind_from_extension)
        .unwrap_or(Kind::Other)
}

fn kind_from_mime(mime: &str) -> Option<Kind> {
    let mime = mime.trim();
    let prefix = mime.split('/').next()?;
    if prefix.len() == mime.len() {
        return None;
    }
    match prefix.to_ascii_lowercase().as_str() {
        "image" => Some(Kind::Image),
        "video" => Some(Kind::Video),
        "audio" => Some(Kind::Audio),
        _ => None,
    }
}

/// Looks up a single extension (without the dot) case-insensitively.
#[must_use]
pub fn kind_from_extension(ext: &str) -> Kind {
    let ext = ext.to_ascii_lowercase();
    let tables = [
        (IMAGE_EXTENSIONS, Kind::Image),
        (VIDEO_EXTENSIONS, Kind::Video),
        (AUDIO_EXTENSIONS, Kind::Audio),
        (DOCUMENT_EXTENSIONS, Kind::Document),
        (ARCHIVE_EXTENSIONS, Kind::Archive),
    ];
    tables
        .iter()
        .find(|(table, _)| table.contains(&ext.as_str()))
        .map(|(_, kind)| *kind)
        .unwrap_or(Kind::Other)
}

/// Final extension of a name, without the dot. Dot-files have none.
#[must_use]
pub fn extension_of(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
        Some(_) => None,
    }
}

/// True when the name carries the given extension, ignoring case.
#[must_use]
pub fn has_extension(name: &str, ext: &str) -> bool {
    extension_of(name).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
