//! A catalog source backed by a JSON manifest.
//!
//! The manifest stands in for a platform media index: it lists records by
//! collection with a trash flag, and belongs to one volume.
//!
//! ```json
//! {
//!   "volume": "primary",
//!   "tier": "primary",
//!   "records": [
//!     { "path": "DCIM/IMG_0001.jpg", "mime": "image/jpeg", "collection": "images" },
//!     { "path": ".trashed-IMG_0002.jpg", "collection": "images", "trashed": true }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory. Missing names
//! default to the file name, missing sizes are read from the filesystem.

use crate::local_storage::LocalStorage;
use parking_lot::RwLock;
use reclaim_core::{
    CatalogSource, Collection, CoreError, Handle, RawRecord, Result, Selector, SourceTier,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub volume: String,
    #[serde(default = "default_tier")]
    pub tier: SourceTier,
    #[serde(default)]
    pub records: Vec<ManifestRecord>,
}

fn default_tier() -> SourceTier {
    SourceTier::Primary
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub collection: Collection,
    #[serde(default)]
    pub trashed: bool,
}

pub struct JsonCatalog {
    manifest_path: PathBuf,
    base_dir: PathBuf,
    volume: String,
    tier: SourceTier,
    manifest: RwLock<Manifest>,
}

impl JsonCatalog {
    pub fn open(manifest_path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = manifest_path.as_ref().to_path_buf();
        let text = fs::read_to_string(&manifest_path)?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| CoreError::invalid(format!("{}: {e}", manifest_path.display())))?;
        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(
            manifest = %manifest_path.display(),
            volume = %manifest.volume,
            records = manifest.records.len(),
            "opened catalog"
        );

        Ok(Self {
            manifest_path,
            base_dir,
            volume: manifest.volume.clone(),
            tier: manifest.tier,
            manifest: RwLock::new(manifest),
        })
    }

    fn resolve(&self, record: &ManifestRecord) -> PathBuf {
        if record.path.is_absolute() {
            record.path.clone()
        } else {
            self.base_dir.join(&record.path)
        }
    }

    fn to_raw(&self, record: &ManifestRecord) -> RawRecord {
        let path = self.resolve(record);
        let name = record.name.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let size = record
            .size
            .or_else(|| fs::metadata(&path).ok().map(|m| m.len()))
            .unwrap_or(0);
        RawRecord {
            handle: LocalStorage::handle_for(&path),
            name,
            mime: record.mime.clone(),
            size,
            trashed: record.trashed,
        }
    }

    fn persist(&self, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| CoreError::invalid(e.to_string()))?;
        let staging = self.manifest_path.with_extension("json.part");
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.manifest_path)?;
        Ok(())
    }
}

fn selected(record: &ManifestRecord, selector: &Selector) -> bool {
    record.collection == selector.collection && (selector.include_trash || !record.trashed)
}

impl CatalogSource for JsonCatalog {
    fn id(&self) -> &str {
        &self.volume
    }

    fn tier(&self) -> SourceTier {
        self.tier
    }

    fn count(&self, selector: &Selector) -> Option<u64> {
        let manifest = self.manifest.read();
        Some(manifest.records.iter().filter(|r| selected(r, selector)).count() as u64)
    }

    fn list_records<'a>(
        &'a self,
        selector: &Selector,
    ) -> Result<Box<dyn Iterator<Item = Result<RawRecord>> + 'a>> {
        let records: Vec<RawRecord> = {
            let manifest = self.manifest.read();
            manifest
                .records
                .iter()
                .filter(|r| selected(r, selector))
                .map(|r| self.to_raw(r))
                .collect()
        };
        Ok(Box::new(records.into_iter().map(Ok)))
    }

    fn untrash(&self, handles: &[Handle]) -> Result<usize> {
        let mut manifest = self.manifest.write();
        let mut restored = 0;
        for index in 0..manifest.records.len() {
            let handle = LocalStorage::handle_for(self.resolve(&manifest.records[index]));
            if manifest.records[index].trashed && handles.contains(&handle) {
                manifest.records[index].trashed = false;
                restored += 1;
            }
        }
        if restored > 0 {
            self.persist(&manifest)?;
        }
        tracing::info!(volume = %self.volume, restored, "restored trashed records");
        Ok(restored)
    }
}
