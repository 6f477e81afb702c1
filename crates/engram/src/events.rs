//! Event contracts between the engine and the surrounding platform
//!
//! Consumed events arrive from external signal sources; produced events
//! are broadcast for observability. The bus is owned by each engine
//! instance rather than living in a process-wide registry, so tests and
//! multi-tenant hosts get deterministic isolation. Subscriptions are
//! disposed of by dropping the receiver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::memory::types::MemoryType;
use crate::stm::retention::ResourceMode;

const DEFAULT_BUS_CAPACITY: usize = 256;

/// Events the engine consumes from external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InputEvent {
    MessageAdded {
        conversation_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    ContextChanged {
        conversation_id: String,
    },
    PreferenceUpdated {
        key: String,
        value: Value,
        sensitive: bool,
    },
    ResourceModeChanged {
        mode: ResourceMode,
    },
    ShutdownRequested,
}

/// Events the engine produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MemoryEvent {
    ItemStored {
        key: String,
    },
    ItemAccessed {
        key: String,
        access_count: u32,
    },
    ItemExpired {
        key: String,
    },
    ItemsPromoted {
        count: usize,
    },
    ItemsPruned {
        count: usize,
        mode: ResourceMode,
    },
    MemoryCreated {
        id: Uuid,
        memory_type: MemoryType,
        importance: u8,
    },
    MemoryConsolidated {
        count: usize,
    },
    ConversationRestored {
        id: String,
        message_count: u32,
    },
}

/// Broadcast channel for produced events.
///
/// Cloning the bus is cheap; all clones feed the same subscribers.
/// Emission is best-effort: slow subscribers may observe lag, and an
/// event with no subscribers is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MemoryEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a subscriber. Dropping the receiver disposes the
    /// registration.
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.tx.subscribe()
    }

    /// Register a subscriber as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<MemoryEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: MemoryEvent) {
        if self.tx.send(event).is_err() {
            // No subscribers; observability events are not control flow.
            tracing::trace!("event dropped: no subscribers");
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(MemoryEvent::ItemStored {
            key: "conversation:a".to_string(),
        });

        let event = rx.recv().await.expect("event should arrive");
        assert_eq!(
            event,
            MemoryEvent::ItemStored {
                key: "conversation:a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::default();
        // Must not panic or error
        bus.emit(MemoryEvent::ItemsPromoted { count: 3 });
    }

    #[tokio::test]
    async fn test_dropping_receiver_disposes_subscription() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let clone = bus.clone();
        clone.emit(MemoryEvent::MemoryConsolidated { count: 2 });

        let event = rx.recv().await.expect("event should arrive");
        assert_eq!(event, MemoryEvent::MemoryConsolidated { count: 2 });
    }

    #[test]
    fn test_input_event_deserializes_kebab_case() {
        let json = r#"{"kind": "resource-mode-changed", "mode": "minimal"}"#;
        let event: InputEvent = serde_json::from_str(json).expect("Failed to parse");
        assert!(matches!(
            event,
            InputEvent::ResourceModeChanged {
                mode: ResourceMode::Minimal
            }
        ));
    }

    #[test]
    fn test_memory_event_serializes_kebab_case() {
        let json = serde_json::to_string(&MemoryEvent::ItemsPruned {
            count: 4,
            mode: ResourceMode::Minimal,
        })
        .expect("Failed to serialize");
        assert!(json.contains("items-pruned"));
        assert!(json.contains("minimal"));
    }
}
