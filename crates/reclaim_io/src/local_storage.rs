//! `Storage` implementation over the local filesystem.

use reclaim_core::{ByteStream, CoreError, Handle, Result, Storage, WriteStream};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Resolves handles that are plain local paths.
///
/// Renames stay within the artifact's directory, which makes them atomic on
/// the filesystems Reclaim targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_for(path: impl AsRef<Path>) -> Handle {
        Handle::new(path.as_ref().to_string_lossy().as_ref())
    }

    pub fn path_of(handle: &Handle) -> PathBuf {
        PathBuf::from(handle.as_str())
    }
}

fn map_io(err: io::Error, path: &Path) -> CoreError {
    match err.kind() {
        io::ErrorKind::NotFound => CoreError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.display().to_string()),
        _ => CoreError::Io(err),
    }
}

fn child_path(dir: &Handle, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CoreError::invalid(format!("'{name}' is not a plain file name")));
    }
    Ok(LocalStorage::path_of(dir).join(name))
}

impl Storage for LocalStorage {
    fn open_read(&self, handle: &Handle) -> Result<Box<dyn ByteStream>> {
        let path = Self::path_of(handle);
        let file = File::open(&path).map_err(|e| map_io(e, &path))?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{fadvise, Advice};

            let _ = fadvise(&file, 0, None, Advice::Sequential);
        }

        Ok(Box::new(file))
    }

    fn create_writable(&self, dir: &Handle, name: &str, _mime_hint: &str) -> Result<Handle> {
        let path = child_path(dir, name)?;
        File::create(&path).map_err(|e| map_io(e, &path))?;
        Ok(Self::handle_for(&path))
    }

    fn open_write(&self, handle: &Handle) -> Result<Box<dyn WriteStream>> {
        let path = Self::path_of(handle);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| map_io(e, &path))?;
        Ok(Box::new(file))
    }

    fn find_child(&self, dir: &Handle, name: &str) -> Result<Option<Handle>> {
        let path = child_path(dir, name)?;
        match fs::symlink_metadata(&path) {
            Ok(_) => Ok(Some(Self::handle_for(&path))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(e, &path)),
        }
    }

    fn rename(&self, handle: &Handle, new_name: &str) -> Result<Handle> {
        let from = Self::path_of(handle);
        let parent = from
            .parent()
            .ok_or_else(|| CoreError::invalid(format!("{} has no parent", from.display())))?;
        let to = child_path(&Self::handle_for(parent), new_name)?;
        fs::rename(&from, &to).map_err(|e| map_io(e, &from))?;

        // Persist the directory entry change itself.
        #[cfg(unix)]
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(CoreError::Io)?;

        Ok(Self::handle_for(&to))
    }

    fn delete(&self, handle: &Handle) -> Result<()> {
        let path = Self::path_of(handle);
        fs::remove_file(&path).map_err(|e| map_io(e, &path))
    }

    fn display_name(&self, handle: &Handle) -> Option<String> {
        Self::path_of(handle)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    fn is_directory(&self, dir: &Handle) -> bool {
        Self::path_of(dir).is_dir()
    }
}
