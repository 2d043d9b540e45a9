//! The persistent store bridge.
//!
//! User overrides persist to a key-value store under `prefsync-<key>`;
//! system values never do. Storage is best-effort throughout: a missing or
//! failing backend degrades every read and write to a no-op, and in-memory
//! state stays authoritative.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

/// Prefix carried by every storage entry the engine writes
/// (`MODULE_PREFIX` plus a separator).
pub const STORAGE_PREFIX: &str = "prefsync-";

/// Storage key for a preference key: `prefsync-<key>`.
pub fn storage_key(key: &str) -> String {
    format!("{STORAGE_PREFIX}{key}")
}

/// Recover the preference key from a storage key, when it carries the
/// module prefix.
pub fn preference_key(storage_key: &str) -> Option<&str> {
    storage_key.strip_prefix(STORAGE_PREFIX)
}

/// Key-value backend for persisted user overrides.
///
/// Implementations swallow their own failures; persistence is not critical
/// for operation.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// A storage change that originated in another context (tab, window,
/// process) sharing the same backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Full storage key, prefix included.
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Ephemeral in-memory backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset an entry, e.g. to model a stored override predating startup.
    pub fn preset(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StorageBackend for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Disk-backed store: a flat JSON object at
/// `<config_dir>/prefsync/preferences.json`.
///
/// The file is read once at open; a missing or unparseable file yields an
/// empty store rather than an error. Every write rewrites the file through
/// a temp file and an atomic rename.
pub struct DiskStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl DiskStore {
    /// Default on-disk location, under the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(crate::MODULE_PREFIX).join("preferences.json"))
    }

    /// Open the store at the default location. `None` when the platform has
    /// no config directory.
    pub fn open() -> Option<Self> {
        Self::default_path().map(Self::at)
    }

    /// Open the store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("ignoring unparseable {}: {err}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries: RefCell::new(entries) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = match serde_json::to_string_pretty(&*self.entries.borrow()) {
            Ok(json) => json,
            Err(err) => {
                warn!("preferences not persisted: {err}");
                return;
            }
        };
        let temp = self.path.with_extension("json.tmp");
        let result = fs::write(&temp, json).and_then(|()| fs::rename(&temp, &self.path));
        if let Err(err) = result {
            warn!("preferences not persisted to {}: {err}", self.path.display());
        }
    }
}

impl StorageBackend for DiskStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_storage_key_roundtrip() {
        assert_eq!(storage_key("theme"), "prefsync-theme");
        assert_eq!(preference_key("prefsync-theme"), Some("theme"));
        assert_eq!(preference_key("other-theme"), None);
    }

    #[test]
    fn test_prefix_derives_from_module_name() {
        assert_eq!(STORAGE_PREFIX, format!("{}-", crate::MODULE_PREFIX));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new().preset("prefsync-theme", "dark");
        assert_eq!(store.get("prefsync-theme").as_deref(), Some("dark"));
        store.set("prefsync-theme", "light");
        assert_eq!(store.get("prefsync-theme").as_deref(), Some("light"));
        assert_eq!(store.get("prefsync-motion"), None);
    }

    #[test]
    fn test_disk_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");

        let store = DiskStore::at(&path);
        store.set("prefsync-theme", "dark");
        assert_eq!(store.get("prefsync-theme").as_deref(), Some("dark"));
        assert!(path.exists(), "store file should exist after a write");

        // A fresh store at the same path sees the persisted entry.
        let reopened = DiskStore::at(&path);
        assert_eq!(reopened.get("prefsync-theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_disk_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::at(dir.path().join("missing.json"));
        assert_eq!(store.get("prefsync-theme"), None);
    }

    #[test]
    fn test_disk_store_invalid_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "not json").unwrap();

        let store = DiskStore::at(&path);
        assert_eq!(store.get("prefsync-theme"), None);

        // Writing replaces the unparseable file with a valid one.
        store.set("prefsync-theme", "dark");
        let reopened = DiskStore::at(&path);
        assert_eq!(reopened.get("prefsync-theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_disk_store_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("preferences.json");
        let store = DiskStore::at(&path);
        store.set("prefsync-density", "compact");
        assert!(path.exists());
    }
}
