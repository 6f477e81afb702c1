//! Memory types for the engram engine
//!
//! Defines the records held by the two tiers: short-term items keyed by
//! string, and long-term curated memories addressed by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use uuid::Uuid;

/// A curated long-term memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier, never reused
    pub id: Uuid,
    /// Classification of what kind of memory this is
    pub memory_type: MemoryType,
    /// The actual content of the memory (opaque payload)
    pub content: Value,
    /// Entities mentioned in the content (names, places, topics)
    pub entities: BTreeSet<String>,
    /// Importance on the 1-5 scale
    pub importance: u8,
    /// When this memory was created
    pub created_at: DateTime<Utc>,
    /// When this memory was last accessed
    pub last_accessed: DateTime<Utc>,
    /// How many times this memory has been accessed
    pub access_count: u32,
    /// Tombstone flag; removed records are kept only so that
    /// `consolidated_into` references stay resolvable
    pub removed: bool,
    /// Id of the anchor this record was merged into, if any
    pub consolidated_into: Option<Uuid>,
    /// Optional conversation this memory belongs to
    pub conversation_id: Option<String>,
    /// Where this memory originated from
    pub source: MemorySource,
}

impl Memory {
    /// Create a new memory with default values
    pub fn new(memory_type: MemoryType, content: Value, importance: u8, source: MemorySource) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            memory_type,
            content,
            entities: BTreeSet::new(),
            importance: importance.clamp(1, 5),
            created_at: now,
            last_accessed: now,
            access_count: 0,
            removed: false,
            consolidated_into: None,
            conversation_id: None,
            source,
        }
    }

    /// Mark this memory as accessed, updating access count and timestamp
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Whether this record participates in active retrieval
    pub fn is_active(&self) -> bool {
        !self.removed
    }

    /// Tombstone this record as absorbed into `anchor_id`
    pub fn absorb_into(&mut self, anchor_id: Uuid) {
        self.removed = true;
        self.consolidated_into = Some(anchor_id);
    }
}

/// Classification of memory types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryType {
    /// A conversation or exchange
    Conversation,
    /// A stated user preference
    Preference,
    /// Something that happened
    Event,
    /// A connection between the owner and another entity
    Relationship,
    /// Something accomplished
    Achievement,
    /// A notable life marker
    Milestone,
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Preference => "preference",
            MemoryType::Event => "event",
            MemoryType::Relationship => "relationship",
            MemoryType::Achievement => "achievement",
            MemoryType::Milestone => "milestone",
        };
        write!(f, "{name}")
    }
}

/// Source of the memory - how it entered the long-term tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemorySource {
    /// Promoted out of the short-term store by the sweep
    Promotion,
    /// Recorded directly as a significant event
    Direct,
    /// Rebuilt from a restored conversation
    Restored,
}

/// Key prefix for conversation-scoped short-term entries.
pub const CONVERSATION_KEY_PREFIX: &str = "conversation:";
/// Key prefix for preference short-term entries.
pub const PREFERENCE_KEY_PREFIX: &str = "preference:";
/// Key prefix for event short-term entries.
pub const EVENT_KEY_PREFIX: &str = "event:";

/// Category of a short-term item, derived from its key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Conversation,
    Preference,
    Event,
    Other,
}

impl ItemCategory {
    /// Derive the category from a short-term key.
    pub fn of(key: &str) -> Self {
        if key.starts_with(CONVERSATION_KEY_PREFIX) {
            ItemCategory::Conversation
        } else if key.starts_with(PREFERENCE_KEY_PREFIX) {
            ItemCategory::Preference
        } else if key.starts_with(EVENT_KEY_PREFIX) {
            ItemCategory::Event
        } else {
            ItemCategory::Other
        }
    }

    /// The long-term type a promoted item of this category maps to.
    pub fn memory_type(&self) -> MemoryType {
        match self {
            ItemCategory::Conversation => MemoryType::Conversation,
            ItemCategory::Preference => MemoryType::Preference,
            ItemCategory::Event | ItemCategory::Other => MemoryType::Event,
        }
    }
}

/// A single entry in the short-term store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StmItem {
    /// Key, unique within the store
    pub key: String,
    /// Opaque payload; ciphertext string when `encrypted` is set
    pub value: Value,
    /// Current importance score (>= 0)
    pub importance: f32,
    /// When this entry was first created by the current write
    pub created_at: DateTime<Utc>,
    /// When this entry was last read
    pub last_accessed: DateTime<Utc>,
    /// When this entry was last written (store/upsert)
    pub refreshed_at: DateTime<Utc>,
    /// Number of reads since the last write
    pub access_count: u32,
    /// Optional expiry; entries past this instant are lazily removed
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether `value` holds ciphertext from the security collaborator
    pub encrypted: bool,
    /// Set when the sweep promotes this entry; cleared on refresh
    pub promoted_at: Option<DateTime<Utc>>,
}

impl StmItem {
    /// Create a new item stamped at the current instant
    pub fn new(key: String, value: Value, importance: f32) -> Self {
        let now = Utc::now();
        Self {
            key,
            value,
            importance: importance.max(0.0),
            created_at: now,
            last_accessed: now,
            refreshed_at: now,
            access_count: 0,
            expires_at: None,
            encrypted: false,
            promoted_at: None,
        }
    }

    /// Mark this item as accessed, updating access count and timestamp
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Category derived from the key prefix
    pub fn category(&self) -> ItemCategory {
        ItemCategory::of(&self.key)
    }

    /// Age of this item relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Summary payload stored for conversation memories, both in the
/// short-term store and as `Memory.content` for `MemoryType::Conversation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub topics: Vec<String>,
    pub message_count: u32,
    pub sentiment: f32,
    pub key_points: Vec<String>,
    pub entities: Vec<String>,
}

impl ConversationSummary {
    /// Serialize into an opaque content payload
    pub fn to_content(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Try to read a summary back out of a content payload
    pub fn from_content(content: &Value) -> Option<Self> {
        serde_json::from_value(content.clone()).ok()
    }
}
