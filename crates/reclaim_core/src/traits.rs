//! Capability traits the recovery engine consumes.
//!
//! These follow the Ports & Adapters pattern: the engine only ever talks to
//! storage through these traits, and concrete platforms provide adapters.

use crate::error::{CoreError, Result};
use crate::types::{Entry, Handle, RawRecord, Selector, SourceTier};
use std::io::{Read, Seek, Write};

/// A readable, seekable byte stream for one handle.
pub trait ByteStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ByteStream for T {}

/// A writable stream for a freshly created artifact.
pub trait WriteStream: Write + Seek + Send {
    /// Forces written bytes to persistent storage.
    fn sync_all(&mut self) -> std::io::Result<()>;
}

impl WriteStream for std::fs::File {
    fn sync_all(&mut self) -> std::io::Result<()> {
        std::fs::File::sync_all(self)
    }
}

/// Resolves handles to bytes and creates, renames and deletes artifacts.
///
/// One `Storage` resolves every handle produced by the sources it fronts,
/// including destination directories.
///
/// # Example
///
/// ```ignore
/// let part = storage.create_writable(&dest, "photo.jpg.part", "image/jpeg")?;
/// let mut out = storage.open_write(&part)?;
/// out.write_all(&bytes)?;
/// out.sync_all()?;
/// let fin = storage.rename(&part, "photo.jpg")?;
/// ```
pub trait Storage: Send + Sync {
    fn open_read(&self, handle: &Handle) -> Result<Box<dyn ByteStream>>;

    /// Creates an empty artifact named `name` inside `dir`.
    fn create_writable(&self, dir: &Handle, name: &str, mime_hint: &str) -> Result<Handle>;

    /// Opens a previously created artifact for writing from offset zero.
    fn open_write(&self, handle: &Handle) -> Result<Box<dyn WriteStream>>;

    /// Looks up a direct child of `dir` by name.
    fn find_child(&self, dir: &Handle, name: &str) -> Result<Option<Handle>>;

    /// Renames an artifact within its directory, returning the new handle.
    fn rename(&self, handle: &Handle, new_name: &str) -> Result<Handle>;

    fn delete(&self, handle: &Handle) -> Result<()>;

    fn display_name(&self, handle: &Handle) -> Option<String>;

    /// True when `dir` names an existing, writable directory.
    fn is_directory(&self, dir: &Handle) -> bool;
}

/// A centrally indexed store of file records, queryable by collection and
/// trash state.
pub trait CatalogSource: Send + Sync {
    /// Volume or collection identifier attached to every item from this source.
    fn id(&self) -> &str;

    fn tier(&self) -> SourceTier;

    /// Exact number of records the selector would yield, when cheap to know.
    fn count(&self, _selector: &Selector) -> Option<u64> {
        None
    }

    /// Lazily enumerates the records matching `selector`.
    fn list_records<'a>(
        &'a self,
        selector: &Selector,
    ) -> Result<Box<dyn Iterator<Item = Result<RawRecord>> + 'a>>;

    /// Clears the trash flag on the given handles, returning how many changed.
    fn untrash(&self, _handles: &[Handle]) -> Result<usize> {
        Err(CoreError::Unsupported(format!(
            "catalog '{}' cannot restore trashed records",
            self.id()
        )))
    }
}

/// A hierarchical directory the user has granted access to.
pub trait DirectoryTree: Send + Sync {
    fn root(&self) -> Handle;

    fn children(&self, dir: &Handle) -> Result<Vec<Entry>>;

    /// Identity of the root directory, when the tree can tell.
    fn root_identity(&self) -> Option<crate::types::DirIdentity> {
        None
    }
}
