//! Durable key/value storage backing the session store.
//!
//! Mirrors the browser `localStorage` contract (string keys, string values)
//! with one addition: writes and removals are batched so that related keys
//! change together or not at all.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::SessionError;

/// String key/value storage with atomic batch updates.
pub trait SessionStorage: Send + Sync {
    /// Read one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Write every entry, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written; storage is unchanged.
    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), SessionError>;

    /// Remove every key, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be applied; storage is unchanged.
    fn remove_all(&self, keys: &[&str]) -> Result<(), SessionError>;
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, SessionError> {
        self.entries.lock().map_err(|_| SessionError::Poisoned)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), SessionError> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_owned(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), SessionError> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage persisted as a single JSON document on disk.
///
/// Every update rewrites the whole document through a temporary file and a
/// rename, so readers see either the old document or the new one.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Storage at `path`. The file and its parent directory are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(document)?;
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().map_err(|_| SessionError::Poisoned)?;
        // A corrupt document is replaced rather than blocking every future write
        let mut document = self.read_document().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session document");
            BTreeMap::new()
        });
        apply(&mut document);
        self.write_document(&document)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), SessionError> {
        self.update(|document| {
            for (key, value) in entries {
                document.insert((*key).to_owned(), value.clone());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), SessionError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|document| {
            for key in keys {
                document.remove(*key);
            }
        })
    }
}
