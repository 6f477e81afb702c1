//! Integration tests for resource-mode retention
//!
//! Covers the three-pass retention sweep under mode changes, decay
//! pushing idle entries below the floor, and the engine re-applying the
//! active policy on its maintenance schedule.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use engram::MemoryEngine;
use engram::config::Config;
use engram::curator::HeuristicExtractor;
use engram::events::{EventBus, InputEvent, MemoryEvent};
use engram::memory::importance::ScorerConfig;
use engram::stm::{ResourceMode, RetentionTable, ShortTermStore, StoreOptions};
use engram::storage::MemoryRecordStore;
use engram::testing::{NullAudit, PlainSecurity, RecordingGraph};

fn short_term(events: EventBus) -> ShortTermStore {
    ShortTermStore::new(
        RetentionTable::default(),
        ScorerConfig::default(),
        Arc::new(PlainSecurity::new()),
        Arc::new(NullAudit),
        events,
    )
}

#[tokio::test]
async fn test_extended_to_minimal_sheds_down_to_policy() {
    let mut stm = short_term(EventBus::default());

    for i in 0..20 {
        stm.store(
            &format!("event:low-{i}"),
            json!({"text": "minor"}),
            StoreOptions::with_importance(2.2),
        )
        .await;
    }
    for i in 0..20 {
        stm.store(
            &format!("event:mid-{i}"),
            json!({"text": "routine"}),
            StoreOptions::with_importance(3.2),
        )
        .await;
    }
    for i in 0..20 {
        stm.store(
            &format!("event:high-{i}"),
            json!({"text": "critical"}),
            StoreOptions::with_importance(4.6),
        )
        .await;
    }

    let outcome = stm.adjust_for_mode(ResourceMode::Extended);
    assert_eq!(outcome.total(), 0, "extended mode keeps everything");
    assert_eq!(stm.len(), 60);

    let outcome = stm.adjust_for_mode(ResourceMode::Minimal);
    assert_eq!(outcome.below_importance, 40);
    assert_eq!(outcome.over_quota, 10);
    assert_eq!(outcome.over_age, 0);
    assert_eq!(stm.len(), 10);

    for item in stm.iter() {
        assert!(item.importance >= 4.0, "{} survived below the floor", item.key);
    }
    assert!(
        stm.peek("event:high-19").is_some(),
        "quota eviction keeps the newest entries"
    );
    assert!(stm.peek("event:high-0").is_none(), "the oldest entries go first");
}

#[tokio::test]
async fn test_decay_pushes_idle_entries_below_the_floor() {
    let mut stm = short_term(EventBus::default());
    stm.store(
        "event:idle",
        json!({"text": "one-off"}),
        StoreOptions::with_importance(2.6),
    )
    .await;
    stm.store(
        "preference:kept",
        json!({"key": "kept", "value": true}),
        StoreOptions::with_importance(4.8),
    )
    .await;

    // First cycle only closes the window opened at construction; the
    // five that follow each apply category decay.
    for _ in 0..6 {
        stm.decay_cycle(Utc::now());
    }

    let idle = stm.peek("event:idle").expect("Entry missing");
    assert!(idle.importance < 2.0, "got {}", idle.importance);
    let kept = stm.peek("preference:kept").expect("Entry missing");
    assert!(kept.importance > 4.5, "got {}", kept.importance);

    let outcome = stm.adjust_for_mode(ResourceMode::Normal);
    assert_eq!(outcome.below_importance, 1);
    assert!(stm.peek("event:idle").is_none());
    assert_eq!(stm.len(), 1);
}

#[tokio::test]
async fn test_read_path_expires_lazily() {
    let mut stm = short_term(EventBus::default());
    stm.store(
        "event:fleeting",
        json!({"text": "soon gone"}),
        StoreOptions::with_importance(3.0).expires_at(Utc::now() - chrono::Duration::seconds(1)),
    )
    .await;
    assert_eq!(stm.len(), 1, "expiry does not happen in the background");

    assert!(stm.retrieve("event:fleeting").await.is_none());
    assert_eq!(stm.len(), 0, "the dead entry is dropped on first touch");
}

#[tokio::test]
async fn test_retention_pass_announces_what_it_pruned() {
    let events = EventBus::default();
    let mut stm = short_term(events.clone());
    for i in 0..3 {
        stm.store(
            &format!("event:noise-{i}"),
            json!({"text": "chatter"}),
            StoreOptions::with_importance(1.2),
        )
        .await;
    }

    let mut rx = events.subscribe();
    stm.adjust_for_mode(ResourceMode::Minimal);

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    assert!(
        seen.contains(&MemoryEvent::ItemsPruned {
            count: 3,
            mode: ResourceMode::Minimal,
        }),
        "got: {seen:?}"
    );
}

#[tokio::test]
async fn test_engine_tick_reapplies_the_active_policy() {
    let mut engine = MemoryEngine::open(
        &Config::default(),
        Arc::new(MemoryRecordStore::new()),
        Arc::new(PlainSecurity::new()),
        Arc::new(RecordingGraph::new()),
        Arc::new(NullAudit),
        Arc::new(HeuristicExtractor::new()),
    )
    .await
    .expect("Failed to open engine");

    engine
        .adjust_for_mode(ResourceMode::Minimal)
        .expect("Failed to adjust");

    // A new low-importance conversation lands after the mode change.
    engine
        .handle(InputEvent::MessageAdded {
            conversation_id: "conv-1".to_string(),
            text: "Quick hello".to_string(),
            timestamp: Utc::now(),
        })
        .await
        .expect("Failed to handle message");
    assert_eq!(engine.stm().len(), 1);

    engine.maintenance_tick().await;
    assert!(
        engine.stm().is_empty(),
        "each tick re-applies the active retention policy"
    );
    assert_eq!(engine.mode(), ResourceMode::Minimal);
}
