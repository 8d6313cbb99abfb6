//! Storage adapters for the Reclaim engine: local paths as handles, local
//! directory trees, and manifest-backed catalogs.

mod json_catalog;
mod local_storage;
mod local_tree;

pub use json_catalog::{JsonCatalog, Manifest, ManifestRecord};
pub use local_storage::LocalStorage;
pub use local_tree::LocalTree;
