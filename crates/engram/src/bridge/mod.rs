//! Context bridge between live conversations and the memory tiers
//!
//! Feeds activity signals into the short-term store (scored, encrypted,
//! expiring upserts) and restores context back out of it, falling back
//! to the long-term tier when the short-term entry is gone. Restoration
//! failures degrade to a fresh context rather than surfacing an error.

pub mod buffer;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use buffer::ConversationState;

use crate::curator::extractor::EntityExtractor;
use crate::curator::filter::{MemoryFilter, SortOrder};
use crate::curator::store::Curator;
use crate::events::{EventBus, MemoryEvent};
use crate::memory::importance::{self, score_conversation};
use crate::memory::types::{
    CONVERSATION_KEY_PREFIX, ConversationSummary, MemoryType, PREFERENCE_KEY_PREFIX,
};
use crate::stm::store::{ShortTermStore, StoreOptions, is_expired};

pub fn conversation_key(conversation_id: &str) -> String {
    format!("{CONVERSATION_KEY_PREFIX}{conversation_id}")
}

pub fn preference_key(key: &str) -> String {
    format!("{PREFERENCE_KEY_PREFIX}{key}")
}

fn default_conversation_ttl_secs() -> u64 {
    604_800
}

fn default_recent_max_age_days() -> i64 {
    30
}

/// Tuning knobs for the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Expiry for conversation entries in the short-term tier, in
    /// seconds (default: one week)
    #[serde(default = "default_conversation_ttl_secs")]
    pub conversation_ttl_secs: u64,
    /// Lookback for startup restoration, in days (default: 30)
    #[serde(default = "default_recent_max_age_days")]
    pub recent_max_age_days: i64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            conversation_ttl_secs: default_conversation_ttl_secs(),
            recent_max_age_days: default_recent_max_age_days(),
        }
    }
}

/// Which tier a recent conversation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationTier {
    Live,
    ShortTerm,
    LongTerm,
}

/// One entry in a recent-conversations listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentConversation {
    pub id: String,
    pub last_activity: DateTime<Utc>,
    pub tier: ConversationTier,
}

/// Bridges live conversation activity into the memory tiers.
pub struct ContextBridge {
    conversations: HashMap<String, ConversationState>,
    extractor: Arc<dyn EntityExtractor>,
    config: BridgeConfig,
    events: EventBus,
}

impl ContextBridge {
    pub fn new(extractor: Arc<dyn EntityExtractor>, config: BridgeConfig, events: EventBus) -> Self {
        Self {
            conversations: HashMap::new(),
            extractor,
            config,
            events,
        }
    }

    /// Fold a new message into live state and upsert the scored summary
    /// into the short-term store.
    pub async fn on_message_added(
        &mut self,
        stm: &mut ShortTermStore,
        conversation_id: &str,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let state = self
            .conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| ConversationState::new(conversation_id, timestamp));
        state.record_message(text, timestamp, self.extractor.as_ref());
        self.upsert(stm, conversation_id).await
    }

    /// Re-score and re-upsert a conversation after an external context
    /// change. Unknown conversations are ignored.
    pub async fn on_context_changed(
        &mut self,
        stm: &mut ShortTermStore,
        conversation_id: &str,
    ) -> bool {
        if !self.conversations.contains_key(conversation_id) {
            tracing::debug!(conversation_id, "context change for unknown conversation ignored");
            return false;
        }
        self.upsert(stm, conversation_id).await
    }

    /// Record a preference in the short-term tier. Preferences carry
    /// high importance, never expire on their own, and are encrypted
    /// when flagged sensitive.
    pub async fn on_preference_updated(
        &self,
        stm: &mut ShortTermStore,
        key: &str,
        value: Value,
        sensitive: bool,
    ) -> bool {
        let content = serde_json::json!({ "key": key, "value": value });
        let mut options = StoreOptions::with_importance(importance::HIGH);
        if sensitive {
            options = options.encrypted();
        }
        stm.store(&preference_key(key), content, options).await
    }

    async fn upsert(&self, stm: &mut ShortTermStore, conversation_id: &str) -> bool {
        let Some(state) = self.conversations.get(conversation_id) else {
            return false;
        };
        let score = score_conversation(&state.snapshot(), stm.scorer());
        let summary = state.summary();
        let expires = Utc::now() + Duration::seconds(self.config.conversation_ttl_secs as i64);
        stm.store(
            &conversation_key(conversation_id),
            summary.to_content(),
            StoreOptions::with_importance(score)
                .encrypted()
                .expires_at(expires),
        )
        .await
    }

    /// Restore one conversation: short-term entry first, then the most
    /// recent matching long-term memory. Returns `None` when nothing
    /// restorable exists; failures degrade to `None` after logging.
    pub async fn restore_conversation(
        &mut self,
        stm: &mut ShortTermStore,
        curator: &mut Curator,
        conversation_id: &str,
    ) -> Option<ConversationSummary> {
        if let Some(value) = stm.retrieve(&conversation_key(conversation_id)).await {
            if let Some(summary) = ConversationSummary::from_content(&value) {
                return Some(self.adopt(summary));
            }
            tracing::warn!(conversation_id, "short-term conversation entry is malformed");
        }

        let filter = MemoryFilter::new()
            .with_memory_types(vec![MemoryType::Conversation])
            .with_conversation_id(conversation_id)
            .sorted_by(SortOrder::Recency)
            .with_limit(1);
        match curator.retrieve_memories(&filter).await {
            Ok(memories) => {
                let memory = memories.into_iter().next()?;
                let summary = ConversationSummary::from_content(&memory.content)?;
                Some(self.adopt(summary))
            }
            Err(e) => {
                tracing::warn!(conversation_id, error = %e, "conversation restore failed, starting fresh");
                None
            }
        }
    }

    fn adopt(&mut self, summary: ConversationSummary) -> ConversationSummary {
        self.events.emit(MemoryEvent::ConversationRestored {
            id: summary.conversation_id.clone(),
            message_count: summary.message_count,
        });
        tracing::info!(
            conversation_id = %summary.conversation_id,
            messages = summary.message_count,
            "conversation restored"
        );
        self.conversations.insert(
            summary.conversation_id.clone(),
            ConversationState::from_summary(&summary),
        );
        summary
    }

    /// Union recent conversations across {live, short-term, long-term},
    /// de-duplicated by id with the liveliest tier winning, sorted by
    /// recency, truncated to `limit`.
    pub async fn find_recent_conversations(
        &mut self,
        stm: &mut ShortTermStore,
        curator: &mut Curator,
        limit: usize,
        max_age_days: i64,
    ) -> Vec<RecentConversation> {
        let now = Utc::now();
        let cutoff = now - Duration::days(max_age_days);
        let mut merged: HashMap<String, RecentConversation> = HashMap::new();

        for state in self.conversations.values() {
            if state.last_activity() >= cutoff {
                merged.insert(
                    state.id().to_string(),
                    RecentConversation {
                        id: state.id().to_string(),
                        last_activity: state.last_activity(),
                        tier: ConversationTier::Live,
                    },
                );
            }
        }

        for item in stm.iter() {
            let Some(id) = item.key.strip_prefix(CONVERSATION_KEY_PREFIX) else {
                continue;
            };
            if is_expired(item, now) || item.refreshed_at < cutoff {
                continue;
            }
            merged
                .entry(id.to_string())
                .or_insert_with(|| RecentConversation {
                    id: id.to_string(),
                    last_activity: item.refreshed_at,
                    tier: ConversationTier::ShortTerm,
                });
        }

        let filter = MemoryFilter::new()
            .with_memory_types(vec![MemoryType::Conversation])
            .sorted_by(SortOrder::Recency);
        match curator.retrieve_memories(&filter).await {
            Ok(memories) => {
                for memory in memories {
                    let Some(summary) = ConversationSummary::from_content(&memory.content) else {
                        continue;
                    };
                    if summary.last_activity < cutoff {
                        continue;
                    }
                    merged
                        .entry(summary.conversation_id.clone())
                        .or_insert_with(|| RecentConversation {
                            id: summary.conversation_id.clone(),
                            last_activity: summary.last_activity,
                            tier: ConversationTier::LongTerm,
                        });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "long-term scan failed during recent-conversation lookup");
            }
        }

        let mut results: Vec<RecentConversation> = merged.into_values().collect();
        results.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        results.truncate(limit);
        results
    }

    /// Restore the single most recent conversation across all tiers.
    /// Intended for startup.
    pub async fn restore_recent_conversation(
        &mut self,
        stm: &mut ShortTermStore,
        curator: &mut Curator,
    ) -> Option<ConversationSummary> {
        let recent = self
            .find_recent_conversations(stm, curator, 1, self.config.recent_max_age_days)
            .await;
        let candidate = recent.into_iter().next()?;
        match candidate.tier {
            ConversationTier::Live => self
                .conversations
                .get(&candidate.id)
                .map(|state| state.summary()),
            _ => self.restore_conversation(stm, curator, &candidate.id).await,
        }
    }

    /// Live state for one conversation, if any.
    pub fn live(&self, conversation_id: &str) -> Option<&ConversationState> {
        self.conversations.get(conversation_id)
    }

    pub fn live_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}
