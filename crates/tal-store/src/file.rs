use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, DocumentStore};

/// File-backed document store.
///
/// Each key maps to `<root>/<key>.json`. Writes go to a temporary file in
/// the same directory, are fsynced, then atomically renamed over the target,
/// so readers observe either the old document or the new one.
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "opened file document store");
        Ok(Self { root })
    }

    /// The directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DocumentStore for FileDocumentStore {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        debug!(key, bytes = bytes.len(), "loaded document");
        Ok(Some(value))
    }

    fn store(&self, key: &str, value: &Value) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        sync_dir(&self.root)?;

        debug!(key, bytes = bytes.len(), "stored document");
        Ok(())
    }
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> StoreResult<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> StoreResult<()> {
    Ok(())
}
