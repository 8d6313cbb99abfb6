//! `DirectoryTree` implementation over a local directory.

use crate::local_storage::LocalStorage;
use reclaim_core::{CoreError, DirIdentity, DirectoryTree, Entry, Handle, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A user-chosen local directory, listed one level at a time.
///
/// Children come back sorted by name so repeated scans of an unchanged tree
/// enumerate identically. Symbolic links are followed for metadata, and the
/// target's device/inode pair is reported so the walker can refuse to
/// re-enter a directory it has already seen.
#[derive(Debug, Clone)]
pub struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CoreError::NotFound(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

fn identity(path: &Path) -> Option<DirIdentity> {
    rustix::fs::stat(path).ok().map(|st| DirIdentity {
        device: st.st_dev as u64,
        inode: st.st_ino as u64,
    })
}

impl DirectoryTree for LocalTree {
    fn root(&self) -> Handle {
        LocalStorage::handle_for(&self.root)
    }

    fn root_identity(&self) -> Option<DirIdentity> {
        identity(&self.root)
    }

    fn children(&self, dir: &Handle) -> Result<Vec<Entry>> {
        let dir_path = LocalStorage::path_of(dir);
        let listing = fs::read_dir(&dir_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CoreError::NotFound(dir_path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                CoreError::PermissionDenied(dir_path.display().to_string())
            }
            _ => CoreError::Io(e),
        })?;

        let mut entries = Vec::new();
        for dirent in listing {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(dir = %dir_path.display(), error = %e, "unreadable directory entry");
                    continue;
                }
            };
            let path = dirent.path();
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping dangling entry");
                    continue;
                }
            };
            let is_dir = metadata.is_dir();
            entries.push(Entry {
                handle: LocalStorage::handle_for(&path),
                name: dirent.file_name().to_string_lossy().into_owned(),
                mime: None,
                size: if is_dir { 0 } else { metadata.len() },
                is_dir,
                dir_identity: if is_dir { identity(&path) } else { None },
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
