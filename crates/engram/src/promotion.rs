//! Promotion sweep from the short-term to the long-term tier
//!
//! Runs on a fixed period and once more during shutdown. Re-entrancy is
//! excluded with a busy flag rather than a lock: execution is
//! cooperative, so overlapping triggers are dropped and logged, never
//! queued.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::curator::store::{Curator, MemoryContext};
use crate::error::{EngramError, Result};
use crate::events::MemoryEvent;
use crate::memory::importance::{self, importance_from_score};
use crate::memory::types::{CONVERSATION_KEY_PREFIX, ItemCategory, StmItem};
use crate::stm::store::ShortTermStore;

/// Access count that promotes a medium-importance item.
const FREQUENT_ACCESS_MIN: u32 = 3;
/// Age in days that promotes a medium-importance item on its own.
const MEDIUM_AGE_DAYS: i64 = 2;
/// Age in days for aged low-importance promotion.
const AGED_AGE_DAYS: i64 = 5;
/// Access count required alongside [`AGED_AGE_DAYS`].
const AGED_ACCESS_MIN: u32 = 2;

fn default_period_secs() -> u64 {
    300
}

fn default_grace_secs() -> u64 {
    600
}

fn default_consolidate_every() -> u32 {
    12
}

/// Timing knobs for the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between periodic sweeps (default: 300)
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    /// Items younger than this many seconds are left alone (default: 600)
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
    /// Run consolidation after every Nth sweep (default: 12)
    #[serde(default = "default_consolidate_every")]
    pub consolidate_every: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            grace_secs: default_grace_secs(),
            consolidate_every: default_consolidate_every(),
        }
    }
}

impl SweepConfig {
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.period_secs.max(1))
    }

    pub fn grace(&self) -> Duration {
        Duration::seconds(self.grace_secs as i64)
    }
}

/// Re-entrancy guard shared by the sweep and retention adjustment.
///
/// Execution is cooperative, so a compare-and-swap on acquisition is
/// the only mutual exclusion the engine needs. The guard releases the
/// flag on drop, early returns included.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Claim the flag. Returns `None` when another maintenance pass
    /// holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(BusyGuard { flag: self })
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// RAII claim on a [`BusyFlag`].
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.0.store(false, Ordering::Release);
    }
}

/// Ordered promotion predicates over one short-term item.
pub(crate) fn promotion_due(item: &StmItem, now: DateTime<Utc>) -> bool {
    let age = item.age(now);
    if item.importance >= importance::HIGH {
        return true;
    }
    if item.importance >= importance::MEDIUM && item.access_count >= FREQUENT_ACCESS_MIN {
        return true;
    }
    if item.importance >= importance::MEDIUM && age >= Duration::days(MEDIUM_AGE_DAYS) {
        return true;
    }
    item.importance >= importance::LOW
        && age >= Duration::days(AGED_AGE_DAYS)
        && item.access_count >= AGED_ACCESS_MIN
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Items visited
    pub examined: usize,
    /// Expired items removed along the way
    pub expired: usize,
    /// Memories created in the long-term tier
    pub promoted: usize,
    /// Promotions that failed at a collaborator boundary and stay
    /// queued for the next pass
    pub failed: usize,
}

/// Borrowed worker that runs one promotion sweep.
pub struct Sweeper<'a> {
    stm: &'a mut ShortTermStore,
    curator: &'a mut Curator,
    flag: &'a BusyFlag,
    config: SweepConfig,
}

impl<'a> Sweeper<'a> {
    pub fn new(
        stm: &'a mut ShortTermStore,
        curator: &'a mut Curator,
        flag: &'a BusyFlag,
        config: SweepConfig,
    ) -> Self {
        Self {
            stm,
            curator,
            flag,
            config,
        }
    }

    /// Run one sweep.
    ///
    /// Claims the busy flag for the whole pass; a pass arriving while
    /// another holds the flag is reported as a conflict and dropped. The
    /// flag stays claimed across every await point, so suspension at the
    /// storage boundary cannot let another pass interleave.
    pub async fn run(&mut self) -> Result<SweepOutcome> {
        let Some(_guard) = self.flag.try_acquire() else {
            tracing::warn!("promotion sweep skipped, another maintenance pass is active");
            return Err(EngramError::Concurrency(
                "promotion sweep already running".to_string(),
            ));
        };

        let now = Utc::now();
        self.stm.decay_cycle(now);

        let grace = self.config.grace();
        let mut outcome = SweepOutcome::default();

        // Keys are snapshotted up front; deletions below must not
        // disturb the traversal.
        for key in self.stm.keys() {
            outcome.examined += 1;
            if self.stm.expire_if_due(&key, now) {
                outcome.expired += 1;
                continue;
            }
            let Some(item) = self.stm.peek(&key) else {
                continue;
            };
            if item.age(now) < grace {
                continue;
            }
            if item.promoted_at.is_some_and(|at| at >= item.refreshed_at) {
                continue;
            }
            if !promotion_due(item, now) {
                continue;
            }

            let category = item.category();
            let importance = importance_from_score(item.importance);
            let context = match item.key.strip_prefix(CONVERSATION_KEY_PREFIX) {
                Some(conversation_id) => {
                    MemoryContext::promotion(Some(conversation_id.to_string()))
                }
                None => MemoryContext::promotion(None),
            };

            let Some(content) = self.stm.export_value(&key).await else {
                // Decryption failures are audited by the store; the item
                // stays put for the next pass.
                outcome.failed += 1;
                continue;
            };

            match self
                .curator
                .create_memory(category.memory_type(), content, context, importance)
                .await
            {
                Ok(id) => {
                    outcome.promoted += 1;
                    if category == ItemCategory::Conversation {
                        self.stm.remove(&key);
                    } else {
                        // Dual residency: the short-term copy stays and
                        // is marked so it is not promoted again
                        self.stm.mark_promoted(&key, now);
                    }
                    tracing::debug!(key, %id, "item promoted");
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "promotion failed, item retained for retry");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.promoted > 0 {
            self.curator.events().emit(MemoryEvent::ItemsPromoted {
                count: outcome.promoted,
            });
        }
        tracing::info!(
            examined = outcome.examined,
            promoted = outcome.promoted,
            expired = outcome.expired,
            failed = outcome.failed,
            "promotion sweep complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod busy_flag {
        use super::*;

        #[test]
        fn test_flag_is_exclusive() {
            let flag = BusyFlag::new();
            let guard = flag.try_acquire().expect("first claim should succeed");
            assert!(flag.try_acquire().is_none(), "second claim must be refused");
            drop(guard);
            assert!(flag.try_acquire().is_some(), "drop must release the flag");
        }

        #[test]
        fn test_is_busy_tracks_guard_lifetime() {
            let flag = BusyFlag::new();
            assert!(!flag.is_busy());
            {
                let _guard = flag.try_acquire().unwrap();
                assert!(flag.is_busy());
            }
            assert!(!flag.is_busy());
        }
    }

    mod predicates {
        use super::*;

        fn item(now: DateTime<Utc>, importance: f32, age_days: i64, access_count: u32) -> StmItem {
            let mut item = StmItem::new(
                "conversation:t".to_string(),
                serde_json::json!({ "note": "x" }),
                importance,
            );
            item.created_at = now - Duration::days(age_days);
            item.access_count = access_count;
            item
        }

        #[test]
        fn test_high_importance_promotes_unconditionally() {
            let now = Utc::now();
            assert!(promotion_due(&item(now, 4.0, 0, 0), now));
            assert!(promotion_due(&item(now, 4.7, 0, 0), now));
        }

        #[test]
        fn test_medium_needs_access_or_age() {
            let now = Utc::now();
            assert!(promotion_due(&item(now, 3.0, 0, 3), now));
            assert!(!promotion_due(&item(now, 3.0, 0, 2), now));
            assert!(promotion_due(&item(now, 3.0, 2, 0), now));
            assert!(!promotion_due(&item(now, 3.0, 1, 0), now));
        }

        #[test]
        fn test_low_needs_age_and_access_together() {
            let now = Utc::now();
            assert!(promotion_due(&item(now, 2.0, 5, 2), now));
            assert!(!promotion_due(&item(now, 2.0, 5, 1), now));
            assert!(!promotion_due(&item(now, 2.0, 4, 2), now));
        }

        #[test]
        fn test_trivial_never_promotes() {
            let now = Utc::now();
            assert!(!promotion_due(&item(now, 1.0, 30, 50), now));
        }
    }

    #[test]
    fn test_sweep_config_defaults_from_empty_toml() {
        let config: SweepConfig = toml::from_str("").expect("Failed to parse");
        assert_eq!(config.period_secs, 300);
        assert_eq!(config.grace_secs, 600);
        assert_eq!(config.consolidate_every, 12);
    }
}
