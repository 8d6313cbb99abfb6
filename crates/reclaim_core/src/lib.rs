//! Domain types, storage capability traits and format probes shared by the
//! Reclaim engine and its storage adapters.

mod classify;
mod error;
pub mod formats;
mod traits;
mod types;
mod view;

pub use classify::{classify, extension_of, has_extension, kind_from_extension};
pub use error::{CoreError, Result};
pub use traits::{ByteStream, CatalogSource, DirectoryTree, Storage, WriteStream};
pub use types::{
    base_name, Collection, CorruptReport, DirIdentity, Entry, Handle, Item, Kind, RawRecord,
    ScanProgress, Selector, SourceTier,
};
pub use view::FilteredView;
