//! Collaborator seams for external platform services
//!
//! The engine treats encryption, the relationship graph, and audit
//! reporting as narrow contracts owned by the surrounding platform.
//! Implementations here are deliberately absent; tests use the doubles
//! in [`crate::testing`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Security collaborator performing payload encryption.
///
/// Implementations may refuse an operation on consent/authorization
/// grounds, surfacing `EngramError::PermissionDenied`.
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    /// Encrypt a serialized payload, returning opaque ciphertext.
    async fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypt previously produced ciphertext.
    async fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Relationship-graph collaborator linking the owner to mentioned entities.
#[async_trait]
pub trait RelationshipGraph: Send + Sync {
    /// Record that a memory mentioned `entity`.
    async fn record_association(&self, entity: &str, memory_id: Uuid) -> Result<()>;
}

/// Audit collaborator receiving reports of degraded operations.
///
/// Boundary failures (storage, encryption) are reported here instead of
/// propagating a crash into the interaction path.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Report a caught failure for the named operation.
    async fn record_failure(&self, operation: &str, detail: &str);
}
