//! Picks the probe and repair strategy an item's format supports.

use reclaim_core::{Item, Kind};

/// Format family an item is routed to for probing and repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Header probe, full decode on repair.
    Image,
    /// ISO base media (mp4, mov, m4v, 3gp).
    Mp4,
    Audio,
    Pdf,
    /// Plain text and CSV.
    Text,
    /// Office Open XML documents, which are ZIP containers.
    OfficeZip,
    Zip,
    /// Tar, gzip-compressed when `gzip` is set.
    Tar { gzip: bool },
    /// A single gzip stream with no entry structure to salvage.
    Gzip,
    /// A video or archive container with no parser here (Matroska, AVI,
    /// RAR, 7z). Probed by reading; repair refuses rather than copying.
    Unsupported(Kind),
    /// Anything without a structural parser; probed by reading.
    Opaque,
}

const OFFICE_ZIP_EXTENSIONS: &[&str] = &["docx", "xlsx", "pptx"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "csv"];
const NON_MP4_VIDEO: &[&str] = &["mkv", "webm", "avi"];
const UNPARSED_ARCHIVES: &[&str] = &["rar", "7z"];

impl Route {
    #[must_use]
    pub fn for_item(item: &Item) -> Self {
        let ext = item.extension();
        let ext = ext.as_deref();
        let mime = item.mime().map(str::to_ascii_lowercase);
        let mime = mime.as_deref();

        match item.kind() {
            Kind::Image => Route::Image,
            Kind::Audio => Route::Audio,
            Kind::Video => {
                let matroska = mime.is_some_and(|m| m.contains("matroska") || m.contains("webm"));
                if matroska || ext.is_some_and(|e| NON_MP4_VIDEO.contains(&e)) {
                    Route::Unsupported(Kind::Video)
                } else {
                    Route::Mp4
                }
            }
            Kind::Document => match ext {
                Some("pdf") => Route::Pdf,
                Some(e) if TEXT_EXTENSIONS.contains(&e) => Route::Text,
                Some(e) if OFFICE_ZIP_EXTENSIONS.contains(&e) => Route::OfficeZip,
                _ if mime == Some("application/pdf") => Route::Pdf,
                _ => Route::Opaque,
            },
            Kind::Archive => match ext {
                Some("zip") => Route::Zip,
                Some("tar") => Route::Tar { gzip: false },
                Some("gz") if item.name().to_ascii_lowercase().ends_with(".tar.gz") => {
                    Route::Tar { gzip: true }
                }
                Some("gz") => Route::Gzip,
                Some(e) if UNPARSED_ARCHIVES.contains(&e) => Route::Unsupported(Kind::Archive),
                _ => match mime {
                    Some(m) if m.contains("gzip") => Route::Gzip,
                    Some(m) if m.contains("zip") => Route::Zip,
                    Some(m) if m.contains("tar") => Route::Tar { gzip: false },
                    _ => Route::Unsupported(Kind::Archive),
                },
            },
            Kind::Other => Route::Opaque,
        }
    }

    /// Whether a repair strategy beyond a plain copy exists.
    #[must_use]
    pub fn fixable(self) -> bool {
        matches!(
            self,
            Route::Image | Route::Mp4 | Route::Audio | Route::Zip | Route::Tar { .. }
        )
    }

    /// Report text for a failed structural probe.
    #[must_use]
    pub fn failure_reason(self) -> &'static str {
        match self {
            Route::Image => "image bounds unreadable or incomplete",
            Route::Mp4 => "video container unreadable or has no readable sample",
            Route::Audio => "audio metadata unreadable or duration missing",
            Route::Pdf => "document structure unreadable or has no pages",
            Route::Text => "text document unreadable or empty",
            Route::OfficeZip => "document container damaged",
            Route::Zip => "archive entries unreadable or checksums failed",
            Route::Tar { .. } => "archive entries unreadable or truncated",
            Route::Gzip => "compressed stream corrupt or truncated",
            Route::Unsupported(_) | Route::Opaque => "file unreadable or empty",
        }
    }
}
