//! Single-file JSON store.
//!
//! The whole state is one JSON object kept in memory and rewritten on every
//! mutation. Writes are atomic via temp file + rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::errors::StoreError;
use super::store::KeyValueStore;

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file starts empty. An unreadable or corrupt file is moved
    /// aside to `<path>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(map) => {
                    debug!(
                        event = "core.store.load_completed",
                        path = %path.display(),
                        keys = map.len()
                    );
                    map
                }
                Err(e) => {
                    let backup = corrupt_backup_path(&path);
                    warn!(
                        event = "core.store.load_corrupt",
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e
                    );
                    if let Err(e) = fs::rename(&path, &backup) {
                        warn!(
                            event = "core.store.backup_failed",
                            path = %path.display(),
                            error = %e
                        );
                    }
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let content =
            serde_json::to_string_pretty(entries).map_err(|source| StoreError::Serialization {
                key: "<root>".to_string(),
                source,
            })?;

        let temp_file = self.path.with_extension("json.tmp");
        if let Err(source) = fs::write(&temp_file, content) {
            cleanup_temp_file(&temp_file);
            return Err(StoreError::Io {
                path: temp_file,
                source,
            });
        }
        if let Err(source) = fs::rename(&temp_file, &self.path) {
            cleanup_temp_file(&temp_file);
            return Err(StoreError::Io {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn cleanup_temp_file(temp_file: &Path) {
    if let Err(e) = fs::remove_file(temp_file)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(
            event = "core.store.temp_cleanup_failed",
            path = %temp_file.display(),
            error = %e
        );
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("refresh_count_3", json!(9)).unwrap();
        store.set("session_snapshot", json!({"3": {}})).unwrap();
        store.remove("session_snapshot").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("refresh_count_3").unwrap(), Some(json!(9)));
        assert!(reopened.get("session_snapshot").unwrap().is_none());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("k", json!(true)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("k", json!(1)).unwrap();
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get("anything").unwrap().is_none());
        assert!(dir.path().join("state.json.corrupt").exists());
    }

    #[test]
    fn test_rename_failure_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::open(&path).unwrap();

        // A directory at the target path makes the rename fail.
        fs::create_dir_all(&path).unwrap();
        let result = store.set("k", json!(1));
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!dir.path().join("state.json.tmp").exists());
    }
}
