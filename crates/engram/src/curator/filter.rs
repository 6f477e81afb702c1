//! Filter types for long-term retrieval
//!
//! Narrows retrieval by memory type, entity, importance, and
//! conversation. All criteria are optional and combine with AND logic.

use chrono::{DateTime, Utc};

use crate::memory::types::{Memory, MemoryType};

/// Sort order for retrieval results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Recency,
    /// Highest importance first
    Importance,
}

/// Filter criteria for long-term retrieval.
///
/// Tombstoned memories are excluded unless `include_removed` is set.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Filter by specific memory types (OR logic within this filter)
    pub memory_types: Option<Vec<MemoryType>>,
    /// Only memories tagging this entity
    pub entity: Option<String>,
    /// Minimum importance threshold (inclusive)
    pub min_importance: Option<u8>,
    /// Filter to a specific conversation
    pub conversation_id: Option<String>,
    /// Only memories created at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Sort order for results
    pub sort: SortOrder,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Include tombstoned memories
    pub include_removed: bool,
}

impl MemoryFilter {
    /// Create a new empty filter (no filtering applied)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by memory types
    pub fn with_memory_types(mut self, types: Vec<MemoryType>) -> Self {
        self.memory_types = Some(types);
        self
    }

    /// Filter by a tagged entity
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Filter by minimum importance
    pub fn with_min_importance(mut self, min_importance: u8) -> Self {
        self.min_importance = Some(min_importance);
        self
    }

    /// Filter by conversation ID
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Filter by creation time
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Sort results by the given order
    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Cap the number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Include tombstoned memories in results
    pub fn with_removed(mut self) -> Self {
        self.include_removed = true;
        self
    }

    /// Check whether `memory` satisfies every set criterion.
    pub fn matches(&self, memory: &Memory) -> bool {
        if !self.include_removed && memory.removed {
            return false;
        }
        if let Some(ref types) = self.memory_types {
            if !types.is_empty() && !types.contains(&memory.memory_type) {
                return false;
            }
        }
        if let Some(ref entity) = self.entity {
            if !memory.entities.contains(entity) {
                return false;
            }
        }
        if let Some(min) = self.min_importance {
            if memory.importance < min {
                return false;
            }
        }
        if let Some(ref conversation_id) = self.conversation_id {
            if memory.conversation_id.as_deref() != Some(conversation_id.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if memory.created_at < since {
                return false;
            }
        }
        true
    }

    /// Check if this filter is empty (no conditions set)
    pub fn is_empty(&self) -> bool {
        self.memory_types.is_none()
            && self.entity.is_none()
            && self.min_importance.is_none()
            && self.conversation_id.is_none()
            && self.since.is_none()
            && !self.include_removed
    }
}
