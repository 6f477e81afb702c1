use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Durable key-value backend for the long-term tier.
///
/// Implementations hold records as JSON values under string keys. The
/// long-term curator keeps its own in-process view and treats the store
/// as the system of record, so `set` must replace and `delete` must
/// report whether anything was removed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the record under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` under `key`, replacing any existing record.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove the record under `key`. Returns `true` when a record was
    /// present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Make all writes durable. A no-op for purely in-memory backends.
    async fn flush(&self) -> Result<()>;
}
