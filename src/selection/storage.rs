//! Durable key/value storage for the selected capability.
//!
//! [`FileStorage`] keeps a small JSON document of string keys to string
//! values under the config directory and rewrites it atomically.
//! [`MemoryStorage`] is the in-process equivalent for tests and hosts that
//! do not want anything on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::write_text_atomic;
use crate::error::Error;

/// A string key/value store scoped to one user profile.
pub trait SelectionStorage: Send + Sync {
    /// Read a value. `Ok(None)` when the key has never been written.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the backing store exists but is unreadable.
    fn load(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the value could not be persisted.
    fn save(&self, key: &str, value: &str) -> Result<(), Error>;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate one key.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::default();
        storage
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        storage
    }
}

impl SelectionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage at the default location (`config_dir()/selection.json`).
    pub fn at_default_location() -> Self {
        Self::new(crate::app_dirs::selection_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, Error> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Storage(format!(
                "failed to read selection file '{}': {e}",
                self.path.display()
            ))
        })?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            Error::Storage(format!(
                "failed to parse selection file '{}': {e}",
                self.path.display()
            ))
        })
    }
}

impl SelectionStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A corrupt file is replaced rather than blocking every future write.
        let mut values = self.read_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable selection file");
            BTreeMap::new()
        });
        values.insert(key.to_string(), value.to_string());

        let text = serde_json::to_string_pretty(&values)
            .map_err(|e| Error::Storage(format!("failed to serialize selection: {e}")))?;
        write_text_atomic(&self.path, &text).map_err(|e| {
            Error::Storage(format!(
                "failed to write selection file '{}': {e}",
                self.path.display()
            ))
        })
    }
}
