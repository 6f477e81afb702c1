use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EngramError, Result};
use crate::storage::record::RecordStore;

const SNAPSHOT_FILE: &str = "records.json";

/// File-backed record store.
///
/// Records live in an in-process map and are persisted as one JSON
/// snapshot under the data directory. Writes mark the store dirty;
/// `flush` rewrites the snapshot through a temp file so a crash cannot
/// leave a truncated one behind.
pub struct FileRecordStore {
    path: PathBuf,
    records: Mutex<HashMap<String, Value>>,
    dirty: AtomicBool,
}

impl FileRecordStore {
    /// Open the store rooted at `dir`, loading any existing snapshot.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            EngramError::Storage(format!(
                "Failed to create data directory {}: {e}",
                dir.display()
            ))
        })?;

        let path = dir.join(SNAPSHOT_FILE);
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                EngramError::Storage(format!("Failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                EngramError::Storage(format!("Failed to parse {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %path.display(), records = records.len(), "opened record store");

        Ok(Self {
            path,
            records: Mutex::new(records),
            dirty: AtomicBool::new(false),
        })
    }

    /// Default data directory, under the user's home.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".engram"))
            .unwrap_or_else(|| PathBuf::from(".engram"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.records
            .lock()
            .map_err(|_| EngramError::Storage("Record map lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.lock()?.insert(key.to_string(), value);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.lock()?.remove(key).is_some();
        if removed {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(removed)
    }

    async fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let serialized = {
            let records = self.lock()?;
            serde_json::to_string_pretty(&*records)?
        };

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized).map_err(|e| {
            EngramError::Storage(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            EngramError::Storage(format!(
                "Failed to replace snapshot {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "record snapshot flushed");
        Ok(())
    }
}
