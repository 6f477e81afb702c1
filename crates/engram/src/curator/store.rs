//! Long-term curator
//!
//! Owns the durable memory tier: creation with entity extraction,
//! filtered retrieval, erasure, and aggregate stats. The curator keeps
//! an in-process view of every record and writes through to the record
//! store on each mutation; the store's index record makes the view
//! rebuildable at open.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::collaborators::{AuditSink, RelationshipGraph};
use crate::curator::extractor::EntityExtractor;
use crate::curator::filter::{MemoryFilter, SortOrder};
use crate::curator::timeline::{self, EntitySummary, TimeRange, TimelineDay};
use crate::error::{EngramError, Result};
use crate::events::{EventBus, MemoryEvent};
use crate::memory::types::{Memory, MemorySource, MemoryType};
use crate::storage::record::RecordStore;

const INDEX_KEY: &str = "memories/index";

fn record_key(id: Uuid) -> String {
    format!("memory/{id}")
}

/// Context accompanying a memory creation.
///
/// Carries provenance and any auxiliary payload that should participate
/// in entity extraction alongside the content itself.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    /// Conversation this memory belongs to, if any
    pub conversation_id: Option<String>,
    /// How the memory entered the long-term tier
    pub source: MemorySource,
    /// Auxiliary payload, scanned for entities together with content
    pub extra: Value,
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self {
            conversation_id: None,
            source: MemorySource::Direct,
            extra: Value::Null,
        }
    }
}

impl MemoryContext {
    /// Context for a directly recorded memory
    pub fn direct() -> Self {
        Self::default()
    }

    /// Context for a memory promoted out of the short-term store
    pub fn promotion(conversation_id: Option<String>) -> Self {
        Self {
            conversation_id,
            source: MemorySource::Promotion,
            extra: Value::Null,
        }
    }

    /// Context for a memory rebuilt during conversation restoration
    pub fn restored(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            source: MemorySource::Restored,
            extra: Value::Null,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }
}

/// Aggregate counts over the long-term tier.
#[derive(Debug, Clone, Serialize)]
pub struct CuratorStats {
    pub total: usize,
    pub active: usize,
    pub tombstoned: usize,
    /// Active memories per type
    pub by_type: BTreeMap<MemoryType, usize>,
    /// Mean importance of active memories, 0 when the tier is empty
    pub mean_importance: f32,
}

/// The long-term memory tier for one user.
pub struct Curator {
    store: Arc<dyn RecordStore>,
    extractor: Arc<dyn EntityExtractor>,
    graph: Arc<dyn RelationshipGraph>,
    audit: Arc<dyn AuditSink>,
    events: EventBus,
    memories: HashMap<Uuid, Memory>,
    /// Ids in creation order; retrieval tie-breaks follow this
    insertion: Vec<Uuid>,
}

impl Curator {
    /// Open the curator over `store`, loading every indexed record.
    pub async fn open(
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn EntityExtractor>,
        graph: Arc<dyn RelationshipGraph>,
        audit: Arc<dyn AuditSink>,
        events: EventBus,
    ) -> Result<Self> {
        let mut curator = Self {
            store,
            extractor,
            graph,
            audit,
            events,
            memories: HashMap::new(),
            insertion: Vec::new(),
        };
        curator.load().await?;
        Ok(curator)
    }

    async fn load(&mut self) -> Result<()> {
        let ids: Vec<Uuid> = match self.store.get(INDEX_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => return Ok(()),
        };

        for id in ids {
            match self.store.get(&record_key(id)).await? {
                Some(value) => match serde_json::from_value::<Memory>(value) {
                    Ok(memory) => {
                        self.insertion.push(id);
                        self.memories.insert(id, memory);
                    }
                    Err(e) => {
                        tracing::warn!(%id, error = %e, "skipping unreadable memory record");
                    }
                },
                None => {
                    tracing::warn!(%id, "indexed memory record is missing");
                }
            }
        }

        tracing::debug!(count = self.memories.len(), "long-term memories loaded");
        Ok(())
    }

    /// Create a durable memory.
    ///
    /// The entity set is produced by the configured extractor over
    /// content and context, and each entity is reported to the
    /// relationship graph. Storage failures propagate; graph failures
    /// are audited but do not lose the memory.
    pub async fn create_memory(
        &mut self,
        memory_type: MemoryType,
        content: Value,
        context: MemoryContext,
        importance: u8,
    ) -> Result<Uuid> {
        if content.is_null() {
            return Err(EngramError::Validation(
                "Memory content must not be null".to_string(),
            ));
        }
        if !(1..=5).contains(&importance) {
            return Err(EngramError::Validation(format!(
                "Importance {importance} outside the 1-5 scale"
            )));
        }
        if memory_type == MemoryType::Conversation && context.conversation_id.is_none() {
            return Err(EngramError::Validation(
                "Conversation memories require a conversation id".to_string(),
            ));
        }

        let entities = self.extractor.extract(&content, &context.extra);
        let mut memory = Memory::new(memory_type, content, importance, context.source);
        memory.entities = entities;
        memory.conversation_id = context.conversation_id;
        let id = memory.id;
        let entity_list: Vec<String> = memory.entities.iter().cloned().collect();

        self.persist(&memory).await?;
        self.insertion.push(id);
        self.memories.insert(id, memory);
        if let Err(e) = self.persist_index().await {
            // Keep the in-process view consistent with the durable index
            self.insertion.pop();
            self.memories.remove(&id);
            return Err(e);
        }

        for entity in &entity_list {
            if let Err(e) = self.graph.record_association(entity, id).await {
                tracing::warn!(entity, error = %e, "relationship graph update failed");
                self.audit
                    .record_failure("curator.create_memory", &e.to_string())
                    .await;
            }
        }

        self.events.emit(MemoryEvent::MemoryCreated {
            id,
            memory_type,
            importance,
        });
        tracing::debug!(%id, %memory_type, importance, entities = entity_list.len(), "memory created");
        Ok(id)
    }

    /// Retrieve memories matching `filter`, sorted per the filter.
    ///
    /// Returned records have their access stats updated; the stat
    /// write-back is best-effort and never fails the read.
    pub async fn retrieve_memories(&mut self, filter: &MemoryFilter) -> Result<Vec<Memory>> {
        let mut matched: Vec<(DateTime<Utc>, u8, Uuid)> = Vec::new();
        for id in &self.insertion {
            if let Some(memory) = self.memories.get(id) {
                if filter.matches(memory) {
                    matched.push((memory.created_at, memory.importance, *id));
                }
            }
        }

        // Stable sorts keep insertion order on ties
        match filter.sort {
            SortOrder::Recency => matched.sort_by(|a, b| b.0.cmp(&a.0)),
            SortOrder::Importance => matched.sort_by(|a, b| b.1.cmp(&a.1)),
        }
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }

        let mut results = Vec::with_capacity(matched.len());
        for (_, _, id) in matched {
            let snapshot = match self.memories.get_mut(&id) {
                Some(memory) => {
                    memory.mark_accessed();
                    memory.clone()
                }
                None => continue,
            };
            if let Err(e) = self.persist(&snapshot).await {
                tracing::warn!(%id, error = %e, "access-stat write failed");
                self.audit
                    .record_failure("curator.retrieve_memories", &e.to_string())
                    .await;
            }
            results.push(snapshot);
        }
        Ok(results)
    }

    /// Peek at a memory without touching its access stats.
    pub fn get(&self, id: Uuid) -> Option<&Memory> {
        self.memories.get(&id)
    }

    /// Bucket matching memories by calendar day, newest day first.
    pub fn generate_timeline(&self, range: &TimeRange, filter: &MemoryFilter) -> Vec<TimelineDay> {
        let matching = self
            .insertion
            .iter()
            .filter_map(|id| self.memories.get(id))
            .filter(|memory| filter.matches(memory))
            .cloned();
        timeline::build_timeline(matching, range)
    }

    /// Aggregate view of every active memory tagging `entity`.
    pub fn generate_entity_summary(&self, entity: &str, top: usize) -> Result<EntitySummary> {
        let active = self
            .insertion
            .iter()
            .filter_map(|id| self.memories.get(id))
            .filter(|memory| memory.is_active())
            .cloned();
        timeline::summarize_entity(active, entity, top).ok_or_else(|| {
            EngramError::NotFound(format!("Entity '{entity}' has no active memories"))
        })
    }

    /// Permanently delete a memory, together with any tombstones that
    /// point at it as their consolidation anchor.
    pub async fn erase_memory(&mut self, id: Uuid) -> Result<()> {
        if !self.memories.contains_key(&id) {
            return Err(EngramError::NotFound(format!("Memory {id}")));
        }

        let dependents: Vec<Uuid> = self
            .memories
            .values()
            .filter(|memory| memory.consolidated_into == Some(id))
            .map(|memory| memory.id)
            .collect();

        for target in dependents.iter().chain(std::iter::once(&id)) {
            self.store.delete(&record_key(*target)).await?;
            self.memories.remove(target);
        }
        self.insertion
            .retain(|existing| self.memories.contains_key(existing));
        self.persist_index().await?;

        tracing::info!(%id, tombstones = dependents.len(), "memory erased");
        Ok(())
    }

    /// Aggregate counts over the tier.
    pub fn stats(&self) -> CuratorStats {
        let mut by_type: BTreeMap<MemoryType, usize> = BTreeMap::new();
        let mut active = 0usize;
        let mut importance_sum = 0u32;

        for memory in self.memories.values() {
            if memory.is_active() {
                active += 1;
                importance_sum += memory.importance as u32;
                *by_type.entry(memory.memory_type).or_insert(0) += 1;
            }
        }

        let total = self.memories.len();
        CuratorStats {
            total,
            active,
            tombstoned: total - active,
            by_type,
            mean_importance: if active > 0 {
                importance_sum as f32 / active as f32
            } else {
                0.0
            },
        }
    }

    /// Flush the underlying record store.
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    async fn persist(&self, memory: &Memory) -> Result<()> {
        let value = serde_json::to_value(memory)?;
        self.store.set(&record_key(memory.id), value).await
    }

    async fn persist_index(&self) -> Result<()> {
        self.store
            .set(INDEX_KEY, serde_json::to_value(&self.insertion)?)
            .await
    }

    /// Active memories in creation order, projected for grouping.
    pub(crate) fn grouping_candidates(
        &self,
    ) -> Vec<(Uuid, MemoryType, DateTime<Utc>, BTreeSet<String>)> {
        self.insertion
            .iter()
            .filter_map(|id| self.memories.get(id))
            .filter(|memory| memory.is_active())
            .map(|memory| {
                (
                    memory.id,
                    memory.memory_type,
                    memory.created_at,
                    memory.entities.clone(),
                )
            })
            .collect()
    }

    /// Absorb `absorbed_ids` into the anchor: the anchor keeps its id,
    /// takes the entity union and the group-maximum importance; members
    /// are tombstoned pointing back at the anchor.
    pub(crate) async fn merge_group(
        &mut self,
        anchor_id: Uuid,
        absorbed_ids: &[Uuid],
    ) -> Result<usize> {
        let (mut entities, mut importance) = match self.memories.get(&anchor_id) {
            Some(anchor) => (anchor.entities.clone(), anchor.importance),
            None => return Err(EngramError::NotFound(format!("Anchor memory {anchor_id}"))),
        };

        let mut merged = 0usize;
        let mut to_persist: Vec<Memory> = Vec::new();
        for id in absorbed_ids {
            let Some(member) = self.memories.get_mut(id) else {
                continue;
            };
            entities.extend(member.entities.iter().cloned());
            importance = importance.max(member.importance);
            member.absorb_into(anchor_id);
            to_persist.push(member.clone());
            merged += 1;
        }

        if let Some(anchor) = self.memories.get_mut(&anchor_id) {
            anchor.entities = entities;
            anchor.importance = importance;
            to_persist.push(anchor.clone());
        }

        for memory in &to_persist {
            self.persist(memory).await?;
        }
        Ok(merged)
    }

    #[cfg(test)]
    pub(crate) async fn insert_unchecked(&mut self, memory: Memory) -> Result<()> {
        let id = memory.id;
        self.persist(&memory).await?;
        self.insertion.push(id);
        self.memories.insert(id, memory);
        self.persist_index().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::extractor::HeuristicExtractor;
    use crate::storage::memory::MemoryRecordStore;
    use crate::testing::{NullAudit, RecordingGraph, sample_memory};

    async fn test_curator() -> (Curator, Arc<MemoryRecordStore>, RecordingGraph) {
        let store = Arc::new(MemoryRecordStore::new());
        let graph = RecordingGraph::new();
        let curator = Curator::open(
            store.clone(),
            Arc::new(HeuristicExtractor::new()),
            Arc::new(graph.clone()),
            Arc::new(NullAudit),
            EventBus::default(),
        )
        .await
        .expect("open should succeed on an empty store");
        (curator, store, graph)
    }

    mod create {
        use super::*;

        #[tokio::test]
        async fn test_create_extracts_entities_and_updates_graph() {
            let (mut curator, _, graph) = test_curator().await;

            let id = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "Dinner with Alice in Lyon", "entities": ["Alice"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();

            let memory = curator.get(id).expect("memory should be cached");
            assert!(memory.entities.contains("Alice"));
            assert!(memory.entities.contains("Lyon"));

            let entities = graph.entities();
            assert!(entities.contains(&"Alice".to_string()));
            assert!(entities.contains(&"Lyon".to_string()));
        }

        #[tokio::test]
        async fn test_create_persists_record_and_index() {
            let (mut curator, store, _) = test_curator().await;

            let id = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "note"}),
                    MemoryContext::direct(),
                    2,
                )
                .await
                .unwrap();

            let record = store.get(&record_key(id)).await.unwrap();
            assert!(record.is_some(), "memory record must be written through");

            let index = store.get(INDEX_KEY).await.unwrap().unwrap();
            let ids: Vec<Uuid> = serde_json::from_value(index).unwrap();
            assert_eq!(ids, vec![id]);
        }

        #[tokio::test]
        async fn test_create_emits_event() {
            let (mut curator, _, _) = test_curator().await;
            let mut rx = curator.events().subscribe();

            let id = curator
                .create_memory(
                    MemoryType::Milestone,
                    serde_json::json!({"text": "Ran a marathon"}),
                    MemoryContext::direct(),
                    5,
                )
                .await
                .unwrap();

            assert_eq!(
                rx.recv().await.unwrap(),
                MemoryEvent::MemoryCreated {
                    id,
                    memory_type: MemoryType::Milestone,
                    importance: 5
                }
            );
        }

        #[tokio::test]
        async fn test_validation_failures() {
            let (mut curator, _, _) = test_curator().await;

            let null_content = curator
                .create_memory(MemoryType::Event, Value::Null, MemoryContext::direct(), 3)
                .await;
            assert!(matches!(null_content, Err(EngramError::Validation(_))));

            let bad_importance = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "x"}),
                    MemoryContext::direct(),
                    0,
                )
                .await;
            assert!(matches!(bad_importance, Err(EngramError::Validation(_))));

            let conversation_without_id = curator
                .create_memory(
                    MemoryType::Conversation,
                    serde_json::json!({"text": "x"}),
                    MemoryContext::direct(),
                    3,
                )
                .await;
            assert!(matches!(
                conversation_without_id,
                Err(EngramError::Validation(_))
            ));
            assert!(curator.is_empty(), "rejected payloads must not be stored");
        }

        #[tokio::test]
        async fn test_reopen_restores_state() {
            let store = Arc::new(MemoryRecordStore::new());
            let first_id;
            {
                let mut curator = Curator::open(
                    store.clone(),
                    Arc::new(HeuristicExtractor::new()),
                    Arc::new(RecordingGraph::new()),
                    Arc::new(NullAudit),
                    EventBus::default(),
                )
                .await
                .unwrap();
                first_id = curator
                    .create_memory(
                        MemoryType::Event,
                        serde_json::json!({"text": "persisted"}),
                        MemoryContext::direct(),
                        4,
                    )
                    .await
                    .unwrap();
            }

            let reopened = Curator::open(
                store,
                Arc::new(HeuristicExtractor::new()),
                Arc::new(RecordingGraph::new()),
                Arc::new(NullAudit),
                EventBus::default(),
            )
            .await
            .unwrap();

            assert_eq!(reopened.len(), 1);
            let memory = reopened.get(first_id).expect("record should reload");
            assert_eq!(memory.importance, 4);
        }
    }

    mod retrieve {
        use super::*;
        use chrono::Duration;

        #[tokio::test]
        async fn test_filtering_by_type_and_importance() {
            let (mut curator, _, _) = test_curator().await;
            curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "minor"}),
                    MemoryContext::direct(),
                    2,
                )
                .await
                .unwrap();
            curator
                .create_memory(
                    MemoryType::Milestone,
                    serde_json::json!({"text": "major"}),
                    MemoryContext::direct(),
                    5,
                )
                .await
                .unwrap();

            let results = curator
                .retrieve_memories(
                    &MemoryFilter::new()
                        .with_memory_types(vec![MemoryType::Milestone])
                        .with_min_importance(4),
                )
                .await
                .unwrap();

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].memory_type, MemoryType::Milestone);
        }

        #[tokio::test]
        async fn test_read_updates_access_stats_in_cache_and_store() {
            let (mut curator, store, _) = test_curator().await;
            let id = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "watched"}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();

            let results = curator
                .retrieve_memories(&MemoryFilter::new())
                .await
                .unwrap();
            assert_eq!(results[0].access_count, 1);

            // The write effect of the read must reach the record store
            let record = store.get(&record_key(id)).await.unwrap().unwrap();
            let persisted: Memory = serde_json::from_value(record).unwrap();
            assert_eq!(persisted.access_count, 1);

            curator
                .retrieve_memories(&MemoryFilter::new())
                .await
                .unwrap();
            assert_eq!(curator.get(id).unwrap().access_count, 2);
        }

        #[tokio::test]
        async fn test_recency_sort_newest_first() {
            let (mut curator, _, _) = test_curator().await;
            let old = sample_memory(MemoryType::Event, &[], 3, Duration::days(3));
            let newer = sample_memory(MemoryType::Event, &[], 3, Duration::days(1));
            let old_id = old.id;
            let newer_id = newer.id;
            curator.insert_unchecked(old).await.unwrap();
            curator.insert_unchecked(newer).await.unwrap();

            let results = curator
                .retrieve_memories(&MemoryFilter::new())
                .await
                .unwrap();
            assert_eq!(results[0].id, newer_id);
            assert_eq!(results[1].id, old_id);
        }

        #[tokio::test]
        async fn test_importance_sort_is_stable() {
            let (mut curator, _, _) = test_curator().await;
            let mut ids = Vec::new();
            for importance in [3, 5, 3, 4] {
                ids.push(
                    curator
                        .create_memory(
                            MemoryType::Event,
                            serde_json::json!({"text": "x"}),
                            MemoryContext::direct(),
                            importance,
                        )
                        .await
                        .unwrap(),
                );
            }

            let results = curator
                .retrieve_memories(
                    &MemoryFilter::new().sorted_by(SortOrder::Importance),
                )
                .await
                .unwrap();

            let ordered: Vec<Uuid> = results.iter().map(|m| m.id).collect();
            // 5 first, then 4, then the two 3s in insertion order
            assert_eq!(ordered, vec![ids[1], ids[3], ids[0], ids[2]]);
        }

        #[tokio::test]
        async fn test_limit_truncates() {
            let (mut curator, _, _) = test_curator().await;
            for i in 0..5 {
                curator
                    .create_memory(
                        MemoryType::Event,
                        serde_json::json!({"n": i}),
                        MemoryContext::direct(),
                        3,
                    )
                    .await
                    .unwrap();
            }

            let results = curator
                .retrieve_memories(&MemoryFilter::new().with_limit(2))
                .await
                .unwrap();
            assert_eq!(results.len(), 2);
        }

        #[tokio::test]
        async fn test_tombstoned_memories_are_excluded() {
            let (mut curator, _, _) = test_curator().await;
            let anchor = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Paris"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            let absorbed = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Paris"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            curator.merge_group(anchor, &[absorbed]).await.unwrap();

            let active = curator
                .retrieve_memories(&MemoryFilter::new())
                .await
                .unwrap();
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].id, anchor);

            let all = curator
                .retrieve_memories(&MemoryFilter::new().with_removed())
                .await
                .unwrap();
            assert_eq!(all.len(), 2);
        }
    }

    mod erase {
        use super::*;

        #[tokio::test]
        async fn test_erase_removes_record_and_index_entry() {
            let (mut curator, store, _) = test_curator().await;
            let id = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "ephemeral"}),
                    MemoryContext::direct(),
                    2,
                )
                .await
                .unwrap();

            curator.erase_memory(id).await.unwrap();

            assert!(curator.get(id).is_none());
            assert!(store.get(&record_key(id)).await.unwrap().is_none());
            let index = store.get(INDEX_KEY).await.unwrap().unwrap();
            let ids: Vec<Uuid> = serde_json::from_value(index).unwrap();
            assert!(ids.is_empty());
        }

        #[tokio::test]
        async fn test_erase_missing_is_not_found() {
            let (mut curator, _, _) = test_curator().await;
            let result = curator.erase_memory(Uuid::new_v4()).await;
            assert!(matches!(result, Err(EngramError::NotFound(_))));
        }

        #[tokio::test]
        async fn test_erasing_anchor_removes_its_tombstones() {
            let (mut curator, _, _) = test_curator().await;
            let anchor = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Paris"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            let absorbed = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Paris"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            curator.merge_group(anchor, &[absorbed]).await.unwrap();

            curator.erase_memory(anchor).await.unwrap();

            assert!(curator.get(anchor).is_none());
            assert!(
                curator.get(absorbed).is_none(),
                "tombstones must not outlive their anchor"
            );
            assert!(curator.is_empty());
        }
    }

    mod stats {
        use super::*;

        #[tokio::test]
        async fn test_stats_counts_and_mean() {
            let (mut curator, _, _) = test_curator().await;
            curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "a"}),
                    MemoryContext::direct(),
                    2,
                )
                .await
                .unwrap();
            curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"text": "b"}),
                    MemoryContext::direct(),
                    4,
                )
                .await
                .unwrap();
            curator
                .create_memory(
                    MemoryType::Preference,
                    serde_json::json!({"key": "theme", "value": "dark"}),
                    MemoryContext::direct(),
                    4,
                )
                .await
                .unwrap();

            let stats = curator.stats();
            assert_eq!(stats.total, 3);
            assert_eq!(stats.active, 3);
            assert_eq!(stats.tombstoned, 0);
            assert_eq!(stats.by_type.get(&MemoryType::Event), Some(&2));
            assert_eq!(stats.by_type.get(&MemoryType::Preference), Some(&1));
            assert!((stats.mean_importance - 10.0 / 3.0).abs() < 1e-6);
        }

        #[tokio::test]
        async fn test_stats_separate_tombstoned() {
            let (mut curator, _, _) = test_curator().await;
            let anchor = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Rome"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            let absorbed = curator
                .create_memory(
                    MemoryType::Event,
                    serde_json::json!({"entities": ["Rome"]}),
                    MemoryContext::direct(),
                    3,
                )
                .await
                .unwrap();
            curator.merge_group(anchor, &[absorbed]).await.unwrap();

            let stats = curator.stats();
            assert_eq!(stats.total, 2);
            assert_eq!(stats.active, 1);
            assert_eq!(stats.tombstoned, 1);
        }

        #[tokio::test]
        async fn test_empty_stats() {
            let (curator, _, _) = test_curator().await;
            let stats = curator.stats();
            assert_eq!(stats.total, 0);
            assert_eq!(stats.mean_importance, 0.0);
        }
    }
}
