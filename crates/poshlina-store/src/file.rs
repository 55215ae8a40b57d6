//! File-backed cache: one file per key inside a cache directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{KeyValueStore, StoreError, validate_key};

const ENTRY_EXTENSION: &str = "entry";

/// Cache that survives process restarts.
///
/// Each key is stored as `<dir>/<key>.entry`. Writes go to a temporary file in
/// the same directory and are renamed into place, so a crash mid-write leaves
/// the previous value intact. [`clear`](KeyValueStore::clear) only removes
/// `.entry` files; anything else in the directory is left alone.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open or create a cache directory.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "opened file cache");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Open an existing cache directory without creating it.
    pub fn open_existing(dir: &Path) -> Result<Self, StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::DirectoryNotFound(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(key, bytes = value.len(), "wrote cache entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(removed, dir = %self.dir.display(), "cleared file cache");
        Ok(())
    }
}
