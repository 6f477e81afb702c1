//! Per-user engine composition and event loop
//!
//! `MemoryEngine` owns one user's short-term store, curator, and
//! context bridge, and drives the periodic maintenance that moves items
//! between them. Hosts either feed it `InputEvent`s through [`run`] or
//! call [`handle`] and [`maintenance_tick`] on their own schedule.
//!
//! [`run`]: MemoryEngine::run
//! [`handle`]: MemoryEngine::handle
//! [`maintenance_tick`]: MemoryEngine::maintenance_tick

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::bridge::{ContextBridge, RecentConversation};
use crate::collaborators::{AuditSink, RelationshipGraph, SecurityProvider};
use crate::config::Config;
use crate::curator::{
    ConsolidationConfig, ConsolidationOutcome, Consolidator, Curator, EntityExtractor,
};
use crate::error::{EngramError, Result};
use crate::events::{EventBus, InputEvent};
use crate::memory::types::ConversationSummary;
use crate::promotion::{BusyFlag, SweepConfig, SweepOutcome, Sweeper};
use crate::stm::retention::ResourceMode;
use crate::stm::store::{PruneOutcome, ShortTermStore};
use crate::storage::RecordStore;

/// One user's memory engine: both tiers, the bridge between them, and
/// the maintenance schedule.
pub struct MemoryEngine {
    stm: ShortTermStore,
    curator: Curator,
    bridge: ContextBridge,
    busy: Arc<BusyFlag>,
    sweep: SweepConfig,
    consolidation: ConsolidationConfig,
    events: EventBus,
    mode: ResourceMode,
    ticks_since_consolidation: u32,
}

impl MemoryEngine {
    /// Compose an engine over the given collaborators, loading any
    /// long-term records the store already holds.
    pub async fn open(
        config: &Config,
        store: Arc<dyn RecordStore>,
        security: Arc<dyn SecurityProvider>,
        graph: Arc<dyn RelationshipGraph>,
        audit: Arc<dyn AuditSink>,
        extractor: Arc<dyn EntityExtractor>,
    ) -> Result<Self> {
        let events = EventBus::default();
        let stm = ShortTermStore::new(
            config.retention,
            config.scorer,
            security,
            audit.clone(),
            events.clone(),
        );
        let curator =
            Curator::open(store, extractor.clone(), graph, audit, events.clone()).await?;
        let bridge = ContextBridge::new(extractor, config.bridge, events.clone());

        Ok(Self {
            stm,
            curator,
            bridge,
            busy: Arc::new(BusyFlag::new()),
            sweep: config.sweep,
            consolidation: config.consolidation,
            events,
            mode: ResourceMode::Normal,
            ticks_since_consolidation: 0,
        })
    }

    /// Apply one input event.
    pub async fn handle(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::MessageAdded {
                conversation_id,
                text,
                timestamp,
            } => {
                self.bridge
                    .on_message_added(&mut self.stm, &conversation_id, &text, timestamp)
                    .await;
                Ok(())
            }
            InputEvent::ContextChanged { conversation_id } => {
                self.bridge
                    .on_context_changed(&mut self.stm, &conversation_id)
                    .await;
                Ok(())
            }
            InputEvent::PreferenceUpdated {
                key,
                value,
                sensitive,
            } => {
                self.bridge
                    .on_preference_updated(&mut self.stm, &key, value, sensitive)
                    .await;
                Ok(())
            }
            InputEvent::ResourceModeChanged { mode } => self.adjust_for_mode(mode).map(|_| ()),
            InputEvent::ShutdownRequested => self.shutdown().await,
        }
    }

    /// Switch resource modes and prune the short-term store to the new
    /// policy. Rejected with [`EngramError::Concurrency`] while a sweep
    /// or another adjustment holds the store; the trigger is dropped,
    /// not queued.
    pub fn adjust_for_mode(&mut self, mode: ResourceMode) -> Result<PruneOutcome> {
        let Some(_guard) = self.busy.try_acquire() else {
            tracing::warn!(%mode, "mode change dropped, maintenance already running");
            return Err(EngramError::Concurrency(
                "mode change dropped, maintenance already running".to_string(),
            ));
        };
        self.mode = mode;
        Ok(self.stm.adjust_for_mode(mode))
    }

    /// Run one promotion sweep now.
    pub async fn run_sweep(&mut self) -> Result<SweepOutcome> {
        let mut sweeper = Sweeper::new(&mut self.stm, &mut self.curator, &self.busy, self.sweep);
        sweeper.run().await
    }

    /// Run one consolidation pass over the long-term tier now.
    pub async fn consolidate(&mut self) -> Result<ConsolidationOutcome> {
        let mut consolidator = Consolidator::with_config(&mut self.curator, self.consolidation);
        consolidator.run().await
    }

    /// One scheduled maintenance round: sweep, re-apply the current
    /// retention policy, consolidate on its cadence, flush.
    pub async fn maintenance_tick(&mut self) {
        match self.run_sweep().await {
            Ok(outcome) => {
                if outcome.promoted > 0 || outcome.expired > 0 || outcome.failed > 0 {
                    tracing::debug!(
                        examined = outcome.examined,
                        expired = outcome.expired,
                        promoted = outcome.promoted,
                        failed = outcome.failed,
                        "maintenance sweep finished"
                    );
                }
            }
            // The sweeper already logged the collision.
            Err(EngramError::Concurrency(_)) => return,
            Err(e) => tracing::warn!(error = %e, "promotion sweep failed"),
        }

        // Quota and age limits are enforced lazily; this keeps the
        // store within policy even when no mode change arrives.
        let _ = self.adjust_for_mode(self.mode);

        self.ticks_since_consolidation += 1;
        if self.sweep.consolidate_every > 0
            && self.ticks_since_consolidation >= self.sweep.consolidate_every
        {
            self.ticks_since_consolidation = 0;
            if let Err(e) = self.consolidate().await {
                tracing::warn!(error = %e, "consolidation pass failed");
            }
        }

        if let Err(e) = self.curator.flush().await {
            tracing::warn!(error = %e, "failed to flush long-term records");
        }
    }

    /// Drive the engine from an event channel until shutdown is
    /// requested or the channel closes. Restores the most recent
    /// conversation before accepting events.
    pub async fn run(&mut self, mut input: mpsc::Receiver<InputEvent>) -> Result<()> {
        if let Some(summary) = self.restore_recent_conversation().await {
            tracing::info!(
                conversation_id = %summary.conversation_id,
                "restored recent conversation at startup"
            );
        }

        let period = self.sweep.period();
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticks.tick() => self.maintenance_tick().await,
                event = input.recv() => match event {
                    Some(InputEvent::ShutdownRequested) | None => {
                        return self.shutdown().await;
                    }
                    Some(event) => {
                        if let Err(e) = self.handle(event).await {
                            tracing::warn!(error = %e, "failed to handle input event");
                        }
                    }
                },
            }
        }
    }

    /// Final sweep and flush. Promotion still honors the grace period,
    /// so very fresh items stay in the short-term tier.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down memory engine");
        let mut sweeper = Sweeper::new(&mut self.stm, &mut self.curator, &self.busy, self.sweep);
        match sweeper.run().await {
            Ok(outcome) => {
                tracing::info!(promoted = outcome.promoted, "final promotion sweep finished");
            }
            Err(e) => tracing::warn!(error = %e, "final promotion sweep failed"),
        }
        self.curator.flush().await
    }

    /// Restore one conversation by id, preferring the short-term copy.
    pub async fn restore_conversation(
        &mut self,
        conversation_id: &str,
    ) -> Option<ConversationSummary> {
        self.bridge
            .restore_conversation(&mut self.stm, &mut self.curator, conversation_id)
            .await
    }

    /// List recent conversations across all tiers, newest first.
    pub async fn find_recent_conversations(
        &mut self,
        limit: usize,
        max_age_days: i64,
    ) -> Vec<RecentConversation> {
        self.bridge
            .find_recent_conversations(&mut self.stm, &mut self.curator, limit, max_age_days)
            .await
    }

    /// Restore the most recently active conversation, if any.
    pub async fn restore_recent_conversation(&mut self) -> Option<ConversationSummary> {
        self.bridge
            .restore_recent_conversation(&mut self.stm, &mut self.curator)
            .await
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn mode(&self) -> ResourceMode {
        self.mode
    }

    /// Shared busy flag. Hosts can check it before triggering manual
    /// maintenance.
    pub fn busy_flag(&self) -> Arc<BusyFlag> {
        self.busy.clone()
    }

    pub fn stm(&self) -> &ShortTermStore {
        &self.stm
    }

    pub fn stm_mut(&mut self) -> &mut ShortTermStore {
        &mut self.stm
    }

    pub fn curator(&self) -> &Curator {
        &self.curator
    }

    pub fn curator_mut(&mut self) -> &mut Curator {
        &mut self.curator
    }

    pub fn bridge(&self) -> &ContextBridge {
        &self.bridge
    }
}
