use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque, stable reference to a file or directory known to a storage source.
///
/// Handles are the only identity the engine uses for items; list positions
/// carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Arc<str>);

impl Handle {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Image,
        Kind::Video,
        Kind::Audio,
        Kind::Document,
        Kind::Archive,
        Kind::Other,
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collections a catalog source is queried by, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Images,
    Video,
    Audio,
    Files,
}

impl Collection {
    pub const SCAN_ORDER: [Collection; 4] = [
        Collection::Images,
        Collection::Video,
        Collection::Audio,
        Collection::Files,
    ];
}

/// Where a source sits in the enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Primary,
    Removable,
    Tree,
}

/// Query passed to a catalog source for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub collection: Collection,
    pub include_trash: bool,
}

/// A record as reported by a catalog source, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub handle: Handle,
    pub name: String,
    pub mime: Option<String>,
    pub size: u64,
    pub trashed: bool,
}

/// A child of a directory as reported by a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub handle: Handle,
    pub name: String,
    pub mime: Option<String>,
    pub size: u64,
    pub is_dir: bool,
    /// Identity of the directory this entry resolves to, used to avoid
    /// revisiting the same directory through links. `None` when the tree
    /// cannot tell.
    pub dir_identity: Option<DirIdentity>,
}

impl Entry {
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.is_dir
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirIdentity {
    pub device: u64,
    pub inode: u64,
}

/// Recovered-file descriptor. Immutable once built; derived values such as
/// the damage flag are attached by producing a new `Item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    handle: Handle,
    name: String,
    mime: Option<String>,
    size: u64,
    source_id: Option<String>,
    kind: Kind,
    is_trashed: bool,
    damaged: Option<bool>,
}

impl Item {
    pub fn new(
        handle: Handle,
        name: impl Into<String>,
        mime: Option<String>,
        size: u64,
        source_id: Option<String>,
        is_trashed: bool,
    ) -> Self {
        let name = name.into();
        let kind = crate::classify(&name, mime.as_deref());
        Self {
            handle,
            name,
            mime,
            size,
            source_id,
            kind,
            is_trashed,
            damaged: None,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_trashed(&self) -> bool {
        self.is_trashed
    }

    /// `None` until a corruption check has been attached.
    pub fn damaged(&self) -> Option<bool> {
        self.damaged
    }

    /// Returns a copy of this item carrying the outcome of a corruption check.
    #[must_use]
    pub fn with_damaged(&self, damaged: bool) -> Self {
        Self {
            damaged: Some(damaged),
            ..self.clone()
        }
    }

    /// Lower-cased extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        crate::extension_of(&self.name).map(str::to_ascii_lowercase)
    }

    /// Display name without its final extension.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Composite key used to collapse records seen through several sources.
    pub fn dedup_key(&self) -> (&str, u64) {
        (&self.name, self.size)
    }
}

/// Strips the final `.ext` from a display name; dot-files keep their name.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Outcome of a failed corruption check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorruptReport {
    pub item: Item,
    pub reason: String,
    /// Whether a non-trivial repair strategy exists for the item's kind.
    pub fixable: bool,
}

impl CorruptReport {
    pub fn new(item: &Item, reason: impl Into<String>, fixable: bool) -> Self {
        Self {
            item: item.clone(),
            reason: reason.into(),
            fixable,
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        self.item.source_id()
    }
}

/// Progress snapshot for long-running enumeration.
///
/// `processed` and `expected` are authoritative; the percentage is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanProgress {
    pub processed: u64,
    pub expected: u64,
    /// True when `expected` is an exact pre-count rather than a running estimate.
    pub exact: bool,
}

impl ScanProgress {
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.expected == 0 {
            return if self.processed == 0 { 0.0 } else { 100.0 };
        }
        (self.processed as f64 / self.expected as f64 * 100.0).clamp(0.0, 100.0)
    }
}
