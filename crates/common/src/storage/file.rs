//! Durable file-backed storage provider

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{StorageError, StorageProvider};

/// Durable key-value store persisted as a single JSON document
///
/// The whole map is rewritten on every mutation, via a sibling temp file and
/// an atomic rename so a crash mid-write cannot corrupt the previous
/// contents. The map holds a handful of auth keys at most.
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the store at `path`.
    ///
    /// An unreadable or malformed existing file is treated as empty rather
    /// than fatal: losing a stale session forces a clean reauthentication,
    /// which is the recoverable outcome.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "storage file malformed, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "storage file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "opened durable storage");

        Ok(Self { path, entries: RwLock::new(entries) })
    }

    /// The path this store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageProvider for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::file.
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileStorage {
        FileStorage::open(dir.path().join("storage.json")).unwrap()
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store_in(&dir);

        storage.set("token", "abc123").unwrap();
        assert_eq!(storage.get("token"), Some("abc123".to_string()));

        storage.remove("token").unwrap();
        assert_eq!(storage.get("token"), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("token", "persisted").unwrap();
            storage.set("user", "{\"username\":\"ada\"}").unwrap();
        }

        // A fresh open simulates the page reload the auth flow must survive
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token"), Some("persisted".to_string()));
        assert_eq!(reopened.keys().len(), 2);
    }

    #[test]
    fn removing_absent_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store_in(&dir);

        storage.remove("never_set").unwrap();
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json at all {").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.keys().is_empty());

        // And mutations recover the file
        storage.set("token", "fresh").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("token"), Some("fresh".to_string()));
    }

    #[test]
    fn keys_reports_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = store_in(&dir);

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();

        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
