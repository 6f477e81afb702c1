use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EngramError, Result};
use crate::storage::record::RecordStore;

/// In-memory record store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .lock()
            .map_err(|_| EngramError::Storage("Record map lock poisoned".to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| EngramError::Storage("Record map lock poisoned".to_string()))?;
        records.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| EngramError::Storage("Record map lock poisoned".to_string()))?;
        Ok(records.remove(key).is_some())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryRecordStore::new();
        store
            .set("k", serde_json::json!({"v": 1}))
            .await
            .unwrap();

        let value = store.get("k").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"v": 1})));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryRecordStore::new();
        assert!(store.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = MemoryRecordStore::new();
        store.set("k", serde_json::json!(1)).await.unwrap();
        store.set("k", serde_json::json!(2)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(serde_json::json!(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let store = MemoryRecordStore::new();
        store.set("k", Value::Null).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }
}
