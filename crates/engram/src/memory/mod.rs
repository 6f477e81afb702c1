//! Memory types and scoring
//!
//! Defines the records held by both tiers and the importance scoring
//! rules that decide what is worth keeping.

pub mod importance;
pub mod types;

pub use importance::{
    ConversationSnapshot, ScorerConfig, decay_score, importance_from_score, score_conversation,
};
pub use types::{ConversationSummary, ItemCategory, Memory, MemorySource, MemoryType, StmItem};
