//! Aggregate views over the long-term tier
//!
//! Timeline and entity summaries are pure projections: they never touch
//! access stats and never suspend.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::memory::types::{Memory, MemoryType};

/// Half-open-ended time window. Unset bounds are unbounded; set bounds
/// are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything from `days` days ago until now.
    pub fn last_days(days: i64) -> Self {
        Self {
            start: Some(Utc::now() - Duration::days(days)),
            end: None,
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if at > end {
                return false;
            }
        }
        true
    }
}

/// One calendar day of the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineDay {
    pub day: NaiveDate,
    /// Memories created that day, newest first
    pub memories: Vec<Memory>,
}

/// Aggregate view of one entity across the tier.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    /// Number of active memories tagging the entity
    pub mention_count: usize,
    /// Mentions per memory type
    pub type_histogram: BTreeMap<MemoryType, usize>,
    pub first_mention: DateTime<Utc>,
    pub last_mention: DateTime<Utc>,
    pub mean_importance: f32,
    /// The most important mentions, capped by the caller
    pub top_memories: Vec<Memory>,
}

/// Bucket memories by the calendar day of their creation, newest day
/// first.
pub fn build_timeline(
    memories: impl IntoIterator<Item = Memory>,
    range: &TimeRange,
) -> Vec<TimelineDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Memory>> = BTreeMap::new();
    for memory in memories {
        if range.contains(memory.created_at) {
            days.entry(memory.created_at.date_naive())
                .or_default()
                .push(memory);
        }
    }

    days.into_iter()
        .rev()
        .map(|(day, mut memories)| {
            memories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            TimelineDay { day, memories }
        })
        .collect()
}

/// Summarize every supplied memory tagging `entity`. Returns `None`
/// when nothing mentions it.
pub fn summarize_entity(
    memories: impl IntoIterator<Item = Memory>,
    entity: &str,
    top: usize,
) -> Option<EntitySummary> {
    let tagged: Vec<Memory> = memories
        .into_iter()
        .filter(|memory| memory.entities.contains(entity))
        .collect();
    if tagged.is_empty() {
        return None;
    }

    let mut type_histogram: BTreeMap<MemoryType, usize> = BTreeMap::new();
    let mut first_mention = tagged[0].created_at;
    let mut last_mention = tagged[0].created_at;
    let mut importance_sum = 0u32;
    for memory in &tagged {
        *type_histogram.entry(memory.memory_type).or_insert(0) += 1;
        first_mention = first_mention.min(memory.created_at);
        last_mention = last_mention.max(memory.created_at);
        importance_sum += memory.importance as u32;
    }
    let mention_count = tagged.len();
    let mean_importance = importance_sum as f32 / mention_count as f32;

    let mut top_memories = tagged;
    top_memories.sort_by(|a, b| b.importance.cmp(&a.importance));
    top_memories.truncate(top);

    Some(EntitySummary {
        entity: entity.to_string(),
        mention_count,
        type_histogram,
        first_mention,
        last_mention,
        mean_importance,
        top_memories,
    })
}
