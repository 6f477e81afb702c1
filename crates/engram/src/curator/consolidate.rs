//! Anchor-based memory consolidation
//!
//! A single pass over active memories, oldest first. Each unprocessed
//! memory anchors a group and absorbs later memories of the same type
//! that fall inside the anchor's time window and share entities with
//! the anchor itself. Absorbed memories are tombstoned in place so the
//! merge is traceable; anchors are never tombstoned.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::curator::store::Curator;
use crate::error::Result;
use crate::events::MemoryEvent;

fn default_window_secs() -> u64 {
    3600
}

fn default_min_shared_entities() -> usize {
    1
}

/// Tuning knobs for a consolidation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Absorption window after the anchor, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Minimum entity overlap with the anchor for absorption
    #[serde(default = "default_min_shared_entities")]
    pub min_shared_entities: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            min_shared_entities: default_min_shared_entities(),
        }
    }
}

impl ConsolidationConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs as i64)
    }
}

/// What a consolidation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    /// Active memories considered
    pub examined: usize,
    /// Anchors that absorbed at least one member
    pub groups: usize,
    /// Memories tombstoned into an anchor
    pub merged: usize,
}

/// Borrowed worker that runs consolidation over a curator.
pub struct Consolidator<'a> {
    curator: &'a mut Curator,
    config: ConsolidationConfig,
}

impl<'a> Consolidator<'a> {
    pub fn new(curator: &'a mut Curator) -> Self {
        Self::with_config(curator, ConsolidationConfig::default())
    }

    pub fn with_config(curator: &'a mut Curator, config: ConsolidationConfig) -> Self {
        Self { curator, config }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Run one consolidation pass.
    ///
    /// Grouping decisions are computed over a snapshot of the store
    /// taken at the start of the pass, so merges applied along the way
    /// cannot influence later groups.
    pub async fn run(&mut self) -> Result<ConsolidationOutcome> {
        let mut candidates = self.curator.grouping_candidates();
        candidates.sort_by(|a, b| a.2.cmp(&b.2));

        let window = self.config.window();
        let mut processed: HashSet<Uuid> = HashSet::new();
        let mut outcome = ConsolidationOutcome {
            examined: candidates.len(),
            ..Default::default()
        };

        for i in 0..candidates.len() {
            let (anchor_id, anchor_type, anchor_at, ref anchor_entities) = candidates[i];
            if processed.contains(&anchor_id) {
                continue;
            }
            processed.insert(anchor_id);

            let mut absorbed: Vec<Uuid> = Vec::new();
            for j in (i + 1)..candidates.len() {
                let (id, memory_type, created_at, ref entities) = candidates[j];
                // Candidates are time-ordered; past the window nothing
                // later can qualify either.
                if created_at - anchor_at > window {
                    break;
                }
                if processed.contains(&id) || memory_type != anchor_type {
                    continue;
                }
                // Membership is judged against the anchor's own entity
                // set, never against other absorbed members.
                let shared = entities.intersection(anchor_entities).count();
                if shared >= self.config.min_shared_entities {
                    processed.insert(id);
                    absorbed.push(id);
                }
            }

            if !absorbed.is_empty() {
                outcome.merged += self.curator.merge_group(anchor_id, &absorbed).await?;
                outcome.groups += 1;
            }
        }

        if outcome.merged > 0 {
            self.curator.events().emit(MemoryEvent::MemoryConsolidated {
                count: outcome.merged,
            });
            tracing::info!(
                examined = outcome.examined,
                groups = outcome.groups,
                merged = outcome.merged,
                "consolidation pass complete"
            );
        } else {
            tracing::debug!(examined = outcome.examined, "nothing to consolidate");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::extractor::HeuristicExtractor;
    use crate::events::EventBus;
    use crate::memory::types::{Memory, MemoryType};
    use crate::storage::memory::MemoryRecordStore;
    use crate::testing::{NullAudit, RecordingGraph, sample_memory};
    use std::sync::Arc;

    async fn curator_with(memories: Vec<Memory>) -> Curator {
        let mut curator = Curator::open(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(HeuristicExtractor::new()),
            Arc::new(RecordingGraph::new()),
            Arc::new(NullAudit),
            EventBus::default(),
        )
        .await
        .expect("open should succeed on an empty store");
        for memory in memories {
            curator
                .insert_unchecked(memory)
                .await
                .expect("fixture insert should succeed");
        }
        curator
    }

    fn minutes_old(
        memory_type: MemoryType,
        entities: &[&str],
        importance: u8,
        minutes: i64,
    ) -> Memory {
        sample_memory(memory_type, entities, importance, Duration::minutes(minutes))
    }

    #[tokio::test]
    async fn test_merges_same_type_overlapping_entities_within_window() {
        let older = minutes_old(MemoryType::Conversation, &["Paris", "Louvre"], 2, 50);
        let newer = minutes_old(MemoryType::Conversation, &["Paris"], 4, 40);
        let older_id = older.id;
        let newer_id = newer.id;
        let mut curator = curator_with(vec![older, newer]).await;

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();

        assert_eq!(outcome, ConsolidationOutcome { examined: 2, groups: 1, merged: 1 });

        // The older memory anchors; the newer one is tombstoned into it
        let anchor = curator.get(older_id).unwrap();
        assert!(anchor.is_active(), "anchors are never tombstoned");
        assert_eq!(anchor.importance, 4, "anchor takes the group maximum");
        assert!(anchor.entities.contains("Paris"));
        assert!(anchor.entities.contains("Louvre"));

        let absorbed = curator.get(newer_id).unwrap();
        assert!(absorbed.removed);
        assert_eq!(absorbed.consolidated_into, Some(older_id));
    }

    #[tokio::test]
    async fn test_second_pass_merges_nothing() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Conversation, &["Paris"], 3, 50),
            minutes_old(MemoryType::Conversation, &["Paris"], 3, 40),
            minutes_old(MemoryType::Event, &["Tokyo"], 3, 30),
        ])
        .await;

        let first = Consolidator::new(&mut curator).run().await.unwrap();
        assert_eq!(first.merged, 1);

        let second = Consolidator::new(&mut curator).run().await.unwrap();
        assert_eq!(second.merged, 0, "repeat pass must not merge further");
        assert_eq!(second.examined, 2);
    }

    #[tokio::test]
    async fn test_different_types_never_merge() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Conversation, &["Paris"], 3, 50),
            minutes_old(MemoryType::Event, &["Paris"], 3, 40),
        ])
        .await;

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();
        assert_eq!(outcome.merged, 0);
    }

    #[tokio::test]
    async fn test_window_bounds_absorption() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Event, &["Paris"], 3, 180),
            minutes_old(MemoryType::Event, &["Paris"], 3, 30),
        ])
        .await;

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();
        assert_eq!(outcome.merged, 0, "a 2.5 hour gap exceeds the window");
    }

    #[tokio::test]
    async fn test_disjoint_entities_never_merge() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Event, &["Paris"], 3, 50),
            minutes_old(MemoryType::Event, &["Tokyo"], 3, 40),
        ])
        .await;

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();
        assert_eq!(outcome.merged, 0);
    }

    #[tokio::test]
    async fn test_absorption_is_anchor_only_not_transitive() {
        // B overlaps the anchor A; C overlaps only B
        let a = minutes_old(MemoryType::Event, &["X"], 3, 50);
        let b = minutes_old(MemoryType::Event, &["X", "Y"], 3, 40);
        let c = minutes_old(MemoryType::Event, &["Y"], 3, 30);
        let a_id = a.id;
        let b_id = b.id;
        let c_id = c.id;
        let mut curator = curator_with(vec![a, b, c]).await;

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();

        assert_eq!(outcome.merged, 1);
        assert_eq!(curator.get(b_id).unwrap().consolidated_into, Some(a_id));
        assert!(
            curator.get(c_id).unwrap().is_active(),
            "an entity shared only with an absorbed member must not chain"
        );
    }

    #[tokio::test]
    async fn test_min_shared_entities_raises_the_bar() {
        let config = ConsolidationConfig {
            min_shared_entities: 2,
            ..Default::default()
        };
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Event, &["Paris", "Louvre"], 3, 50),
            minutes_old(MemoryType::Event, &["Paris"], 3, 40),
            minutes_old(MemoryType::Event, &["Paris", "Louvre", "Seine"], 3, 30),
        ])
        .await;

        let outcome = Consolidator::with_config(&mut curator, config)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.merged, 1, "only the two-entity overlap qualifies");
    }

    #[tokio::test]
    async fn test_emits_consolidated_event_with_total() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Event, &["Paris"], 3, 50),
            minutes_old(MemoryType::Event, &["Paris"], 3, 45),
            minutes_old(MemoryType::Event, &["Paris"], 3, 40),
        ])
        .await;
        let mut rx = curator.events().subscribe();

        let outcome = Consolidator::new(&mut curator).run().await.unwrap();

        assert_eq!(outcome.merged, 2);
        assert_eq!(
            rx.recv().await.unwrap(),
            MemoryEvent::MemoryConsolidated { count: 2 }
        );
    }

    #[tokio::test]
    async fn test_tombstoned_members_are_ignored_on_later_passes() {
        let mut curator = curator_with(vec![
            minutes_old(MemoryType::Event, &["Paris"], 3, 50),
            minutes_old(MemoryType::Event, &["Paris"], 3, 40),
        ])
        .await;

        Consolidator::new(&mut curator).run().await.unwrap();
        let outcome = Consolidator::new(&mut curator).run().await.unwrap();

        assert_eq!(outcome.examined, 1, "tombstones drop out of grouping");
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: ConsolidationConfig = toml::from_str("").expect("Failed to parse");
        assert_eq!(config.window_secs, 3600);
        assert_eq!(config.min_shared_entities, 1);
    }
}
