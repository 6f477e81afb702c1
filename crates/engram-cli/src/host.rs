//! Collaborator implementations for the management CLI
//!
//! The CLI works on stored memories directly and carries no platform
//! relationship graph or audit pipeline: associations are dropped and
//! degraded operations go to the log.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use engram::collaborators::{AuditSink, RelationshipGraph};
use engram::curator::{Curator, HeuristicExtractor};
use engram::error::Result;
use engram::events::EventBus;
use engram::storage::FileRecordStore;

use crate::error::CliResult;

/// Discards entity associations.
pub struct NoGraph;

#[async_trait]
impl RelationshipGraph for NoGraph {
    async fn record_association(&self, _entity: &str, _memory_id: Uuid) -> Result<()> {
        Ok(())
    }
}

/// Reports degraded operations to the log.
pub struct LogAudit;

#[async_trait]
impl AuditSink for LogAudit {
    async fn record_failure(&self, operation: &str, detail: &str) {
        tracing::warn!(operation, detail, "degraded operation");
    }
}

/// Open a curator over the file store at `data_dir`.
pub async fn open_curator(data_dir: &Path) -> CliResult<Curator> {
    let store = Arc::new(FileRecordStore::open(data_dir)?);
    let curator = Curator::open(
        store,
        Arc::new(HeuristicExtractor::new()),
        Arc::new(NoGraph),
        Arc::new(LogAudit),
        EventBus::default(),
    )
    .await?;
    Ok(curator)
}
