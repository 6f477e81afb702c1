//! Test utilities for engram - shared fixtures and collaborator doubles
//!
//! This module provides utilities to speed up test authoring:
//! - Fixture builders for memories and conversation summaries
//! - Collaborator doubles (pass-through security, recording graph/audit)

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::collaborators::{AuditSink, RelationshipGraph, SecurityProvider};
use crate::error::{EngramError, Result};
use crate::memory::types::{ConversationSummary, Memory, MemorySource, MemoryType};

const CIPHER_PREFIX: &str = "enc:";

/// Pass-through security double that prefixes payloads instead of
/// encrypting them, so tests can observe that the encryption path ran.
#[derive(Debug, Clone, Default)]
pub struct PlainSecurity;

impl PlainSecurity {
    pub fn new() -> Self {
        Self
    }

    /// Whether a value looks like ciphertext produced by this double.
    pub fn is_ciphertext(value: &Value) -> bool {
        matches!(value, Value::String(s) if s.starts_with(CIPHER_PREFIX))
    }
}

#[async_trait]
impl SecurityProvider for PlainSecurity {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(format!("{CIPHER_PREFIX}{plaintext}"))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String> {
        ciphertext
            .strip_prefix(CIPHER_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| EngramError::Validation("payload is not ciphertext".to_string()))
    }
}

/// Security double that refuses every request, for exercising the
/// permission-denied path.
#[derive(Debug, Clone, Default)]
pub struct DenyingSecurity;

#[async_trait]
impl SecurityProvider for DenyingSecurity {
    async fn encrypt(&self, _plaintext: &str) -> Result<String> {
        Err(EngramError::PermissionDenied(
            "consent withheld".to_string(),
        ))
    }

    async fn decrypt(&self, _ciphertext: &str) -> Result<String> {
        Err(EngramError::PermissionDenied(
            "consent withheld".to_string(),
        ))
    }
}

/// Relationship-graph double that records every association it is asked
/// to make.
#[derive(Debug, Clone, Default)]
pub struct RecordingGraph {
    associations: Arc<Mutex<Vec<(String, Uuid)>>>,
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn associations(&self) -> Vec<(String, Uuid)> {
        self.associations.lock().unwrap().clone()
    }

    pub fn entities(&self) -> Vec<String> {
        self.associations
            .lock()
            .unwrap()
            .iter()
            .map(|(entity, _)| entity.clone())
            .collect()
    }
}

#[async_trait]
impl RelationshipGraph for RecordingGraph {
    async fn record_association(&self, entity: &str, memory_id: Uuid) -> Result<()> {
        self.associations
            .lock()
            .unwrap()
            .push((entity.to_string(), memory_id));
        Ok(())
    }
}

/// Audit double that records every reported failure.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudit {
    failures: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record_failure(&self, operation: &str, detail: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((operation.to_string(), detail.to_string()));
    }
}

/// Audit double that discards reports.
#[derive(Debug, Clone, Default)]
pub struct NullAudit;

#[async_trait]
impl AuditSink for NullAudit {
    async fn record_failure(&self, _operation: &str, _detail: &str) {}
}

/// Build a memory fixture with the given type, entities, and age.
pub fn sample_memory(
    memory_type: MemoryType,
    entities: &[&str],
    importance: u8,
    age: Duration,
) -> Memory {
    let mut memory = Memory::new(
        memory_type,
        serde_json::json!({ "note": "fixture" }),
        importance,
        MemorySource::Direct,
    );
    memory.created_at = Utc::now() - age;
    memory.last_accessed = memory.created_at;
    for entity in entities {
        memory.entities.insert((*entity).to_string());
    }
    memory
}

/// Build a conversation summary fixture.
pub fn sample_summary(
    conversation_id: &str,
    message_count: u32,
    last_activity: DateTime<Utc>,
) -> ConversationSummary {
    ConversationSummary {
        conversation_id: conversation_id.to_string(),
        started_at: last_activity - Duration::minutes(30),
        last_activity,
        topics: vec!["travel".to_string()],
        message_count,
        sentiment: 0.2,
        key_points: vec!["Discussed itinerary".to_string()],
        entities: vec!["Paris".to_string()],
    }
}
