//! Short-term store: the volatile working tier
//!
//! A per-user keyed store of recent items. Reads update access stats and
//! apply lazy expiry; writes overwrite without merging. Retention
//! pressure is applied through [`ShortTermStore::adjust_for_mode`], and
//! the scorer's persistence decay runs once per evaluation cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::collaborators::{AuditSink, SecurityProvider};
use crate::events::{EventBus, MemoryEvent};
use crate::memory::importance::{self, ScorerConfig, decay_score};
use crate::memory::types::StmItem;
use crate::stm::retention::{ResourceMode, RetentionTable};

/// Expiry predicate shared by reads, the sweep, and retention passes.
/// Every code path that asks "is this expired?" must agree on the
/// answer for the same instant.
pub fn is_expired(item: &StmItem, now: DateTime<Utc>) -> bool {
    item.expires_at.is_some_and(|at| at <= now)
}

/// Options for a short-term write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreOptions {
    /// Initial importance score for the entry
    pub importance: f32,
    /// Request encryption through the security collaborator
    pub encrypt: bool,
    /// Optional expiry instant
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            importance: importance::LOW,
            encrypt: false,
            expires_at: None,
        }
    }
}

impl StoreOptions {
    pub fn with_importance(importance: f32) -> Self {
        Self {
            importance,
            ..Default::default()
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Counts from one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Dropped for scoring below the mode's minimum importance
    pub below_importance: usize,
    /// Dropped for exceeding the mode's maximum age
    pub over_age: usize,
    /// Dropped oldest-first to get back under the item quota
    pub over_quota: usize,
}

impl PruneOutcome {
    pub fn total(&self) -> usize {
        self.below_importance + self.over_age + self.over_quota
    }
}

/// The volatile short-term tier for one user.
pub struct ShortTermStore {
    items: HashMap<String, StmItem>,
    retention: RetentionTable,
    scorer: ScorerConfig,
    last_cycle_at: DateTime<Utc>,
    security: Arc<dyn SecurityProvider>,
    audit: Arc<dyn AuditSink>,
    events: EventBus,
}

impl ShortTermStore {
    pub fn new(
        retention: RetentionTable,
        scorer: ScorerConfig,
        security: Arc<dyn SecurityProvider>,
        audit: Arc<dyn AuditSink>,
        events: EventBus,
    ) -> Self {
        Self {
            items: HashMap::new(),
            retention,
            scorer,
            last_cycle_at: Utc::now(),
            security,
            audit,
            events,
        }
    }

    /// Store a value under `key`, overwriting any existing entry.
    ///
    /// There is no implicit merge: a rewrite replaces the entry's
    /// metadata wholesale, which also resets its promotion state.
    /// Returns `false` when encryption was requested and the security
    /// collaborator failed or refused; the failure is audited and the
    /// previous entry (if any) is left untouched.
    pub async fn store(&mut self, key: &str, value: Value, options: StoreOptions) -> bool {
        let (stored_value, encrypted) = if options.encrypt {
            let plaintext = match serde_json::to_string(&value) {
                Ok(text) => text,
                Err(e) => {
                    self.audit.record_failure("stm.store", &e.to_string()).await;
                    return false;
                }
            };
            match self.security.encrypt(&plaintext).await {
                Ok(ciphertext) => (Value::String(ciphertext), true),
                Err(e) => {
                    tracing::warn!(key, error = %e, "encryption failed, item not stored");
                    self.audit.record_failure("stm.store", &e.to_string()).await;
                    return false;
                }
            }
        } else {
            (value, false)
        };

        let mut item = StmItem::new(key.to_string(), stored_value, options.importance);
        item.expires_at = options.expires_at;
        item.encrypted = encrypted;
        self.items.insert(key.to_string(), item);

        self.events.emit(MemoryEvent::ItemStored {
            key: key.to_string(),
        });
        true
    }

    /// Retrieve the value under `key`.
    ///
    /// Expired entries are removed on read and reported as missing. Hits
    /// update access stats and decrypt transparently; decryption failure
    /// degrades to `None` after auditing.
    pub async fn retrieve(&mut self, key: &str) -> Option<Value> {
        let now = Utc::now();

        match self.items.get(key) {
            None => return None,
            Some(item) if is_expired(item, now) => {
                self.items.remove(key);
                tracing::debug!(key, "expired item removed on read");
                self.events.emit(MemoryEvent::ItemExpired {
                    key: key.to_string(),
                });
                return None;
            }
            Some(_) => {}
        }

        let (value, encrypted, access_count) = {
            let item = self.items.get_mut(key)?;
            item.mark_accessed();
            (item.value.clone(), item.encrypted, item.access_count)
        };

        self.events.emit(MemoryEvent::ItemAccessed {
            key: key.to_string(),
            access_count,
        });

        if encrypted {
            self.decrypt_value(key, &value).await
        } else {
            Some(value)
        }
    }

    async fn decrypt_value(&self, key: &str, value: &Value) -> Option<Value> {
        let Value::String(ciphertext) = value else {
            self.audit
                .record_failure("stm.retrieve", "encrypted payload is not ciphertext")
                .await;
            return None;
        };
        match self.security.decrypt(ciphertext).await {
            Ok(plaintext) => match serde_json::from_str(&plaintext) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    self.audit
                        .record_failure("stm.retrieve", &e.to_string())
                        .await;
                    None
                }
            },
            Err(e) => {
                tracing::warn!(key, error = %e, "decryption failed");
                self.audit
                    .record_failure("stm.retrieve", &e.to_string())
                    .await;
                None
            }
        }
    }

    /// Apply the retention policy for `mode` in three passes: minimum
    /// importance, maximum age, then oldest-first down to the item
    /// quota. On return the store holds at most `policy.max_items`
    /// entries.
    pub fn adjust_for_mode(&mut self, mode: ResourceMode) -> PruneOutcome {
        let policy = *self.retention.policy(mode);
        let now = Utc::now();
        let mut outcome = PruneOutcome::default();

        let below: Vec<String> = self
            .items
            .values()
            .filter(|item| item.importance < policy.min_importance)
            .map(|item| item.key.clone())
            .collect();
        for key in below {
            self.items.remove(&key);
            outcome.below_importance += 1;
        }

        let max_age = policy.max_age();
        let over_age: Vec<String> = self
            .items
            .values()
            .filter(|item| item.age(now) > max_age)
            .map(|item| item.key.clone())
            .collect();
        for key in over_age {
            self.items.remove(&key);
            outcome.over_age += 1;
        }

        if self.items.len() > policy.max_items {
            let mut by_age: Vec<(DateTime<Utc>, String)> = self
                .items
                .values()
                .map(|item| (item.created_at, item.key.clone()))
                .collect();
            by_age.sort_by(|a, b| a.0.cmp(&b.0));

            let excess = self.items.len() - policy.max_items;
            for (_, key) in by_age.into_iter().take(excess) {
                self.items.remove(&key);
                outcome.over_quota += 1;
            }
        }

        let total = outcome.total();
        if total > 0 {
            tracing::info!(
                mode = %mode,
                below_importance = outcome.below_importance,
                over_age = outcome.over_age,
                over_quota = outcome.over_quota,
                "retention pass pruned {total} items"
            );
            self.events
                .emit(MemoryEvent::ItemsPruned { count: total, mode });
        }
        outcome
    }

    /// Run one evaluation cycle of persistence decay: items not
    /// refreshed since the previous cycle lose score by their category
    /// factor.
    pub fn decay_cycle(&mut self, now: DateTime<Utc>) {
        let last_cycle = self.last_cycle_at;
        for item in self.items.values_mut() {
            if item.refreshed_at <= last_cycle {
                item.importance = decay_score(item.importance, item.category(), &self.scorer);
            }
        }
        self.last_cycle_at = now;
    }

    /// Remove an entry if the shared expiry predicate says it is due.
    /// The sweep applies this to every key it visits so that it and the
    /// read path agree on expiry.
    pub fn expire_if_due(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        let due = self.items.get(key).is_some_and(|item| is_expired(item, now));
        if due {
            self.items.remove(key);
            tracing::debug!(key, "expired item removed by sweep");
            self.events.emit(MemoryEvent::ItemExpired {
                key: key.to_string(),
            });
        }
        due
    }

    /// Decrypt and return an entry's value without touching its access
    /// stats. The sweep reads promotion payloads through this.
    pub async fn export_value(&self, key: &str) -> Option<Value> {
        let item = self.items.get(key)?;
        if item.encrypted {
            self.decrypt_value(key, &item.value).await
        } else {
            Some(item.value.clone())
        }
    }

    /// Snapshot of all keys, for traversals that may delete entries.
    pub fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Peek at an entry without touching its access stats.
    pub fn peek(&self, key: &str) -> Option<&StmItem> {
        self.items.get(key)
    }

    /// Iterate entries without touching access stats.
    pub fn iter(&self) -> impl Iterator<Item = &StmItem> {
        self.items.values()
    }

    /// Remove an entry outright.
    pub fn remove(&mut self, key: &str) -> Option<StmItem> {
        self.items.remove(key)
    }

    /// Record that the sweep promoted this entry.
    pub fn mark_promoted(&mut self, key: &str, at: DateTime<Utc>) {
        if let Some(item) = self.items.get_mut(key) {
            item.promoted_at = Some(at);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn retention(&self) -> &RetentionTable {
        &self.retention
    }

    pub fn scorer(&self) -> &ScorerConfig {
        &self.scorer
    }
}
