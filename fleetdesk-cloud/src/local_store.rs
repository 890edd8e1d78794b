//! Per-client key-value storage.
//!
//! The console keeps all working data in a flat string-to-string store.
//! [`FileLocalStore`] persists it as a single JSON object on disk;
//! [`MemoryLocalStore`] keeps it in process for tests and throwaway sessions.

use crate::error::{CloudError, CloudResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Flat key-value store with string values.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> CloudResult<()>;

    fn remove(&self, key: &str) -> CloudResult<()>;

    /// All keys currently present, in sorted order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory local store.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CloudResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CloudResult<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}

/// Local store persisted as one JSON object file.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileLocalStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileLocalStore {
    /// Opens the store at `path`, creating an empty one if the file is missing.
    ///
    /// A file that exists but does not parse is treated as empty.
    pub fn open(path: &Path) -> CloudResult<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("local store {} is corrupt, starting empty: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_through<F>(&self, mutate: F) -> CloudResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CloudError::Storage("local store lock poisoned".to_string()))?;
        // Readers only see the change once it is on disk.
        let mut next = entries.clone();
        mutate(&mut next);

        let serialized = serde_json::to_vec_pretty(&next)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &self.path)?;

        *entries = next;
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CloudResult<()> {
        self.write_through(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> CloudResult<()> {
        self.write_through(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
