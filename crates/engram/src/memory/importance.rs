//! Importance scoring for short-term items
//!
//! Provides the pure scoring function that turns conversation activity
//! signals into a numeric "worth remembering" score, plus the per-cycle
//! persistence decay applied to items that received no new writes.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::memory::types::ItemCategory;

/// Named points on the importance scale.
pub const TRIVIAL: f32 = 1.0;
pub const LOW: f32 = 2.0;
pub const MEDIUM: f32 = 3.0;
pub const HIGH: f32 = 4.0;
pub const CRITICAL: f32 = 5.0;

/// Collapse a continuous score onto the 1-5 scale used by long-term records.
pub fn importance_from_score(score: f32) -> u8 {
    (score.round().clamp(1.0, 5.0)) as u8
}

/// Activity signals for one conversation, sampled by the context bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversationSnapshot {
    /// Number of turns exchanged so far
    pub turn_count: u32,
    /// Questions the assistant has not yet answered
    pub unanswered_questions: u32,
    /// Followups promised but not yet delivered
    pub pending_followups: u32,
    /// When the last message arrived
    pub last_interaction: DateTime<Utc>,
}

/// Configuration for importance scoring parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScorerConfig {
    /// Turn count granting the full history bonus (default: 10)
    #[serde(default = "default_long_history_turns")]
    pub long_history_turns: u32,
    /// Bonus for a long history (default: 1.0)
    #[serde(default = "default_long_history_bonus")]
    pub long_history_bonus: f32,
    /// Turn count granting the reduced history bonus (default: 5)
    #[serde(default = "default_short_history_turns")]
    pub short_history_turns: u32,
    /// Bonus for a moderate history (default: 0.5)
    #[serde(default = "default_short_history_bonus")]
    pub short_history_bonus: f32,
    /// Bonus when unanswered questions are pending (default: 0.5)
    #[serde(default = "default_open_question_bonus")]
    pub open_question_bonus: f32,
    /// Bonus when followups are pending (default: 0.5)
    #[serde(default = "default_followup_bonus")]
    pub followup_bonus: f32,
    /// Bonus when the last interaction is recent (default: 0.5)
    #[serde(default = "default_recent_bonus")]
    pub recent_bonus: f32,
    /// Window for the recency bonus in seconds (default: 3600)
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,
    /// Per-cycle persistence factor for conversation items (default: 0.95)
    #[serde(default = "default_conversation_persistence")]
    pub conversation_persistence: f32,
    /// Per-cycle persistence factor for preference items (default: 0.99)
    #[serde(default = "default_preference_persistence")]
    pub preference_persistence: f32,
    /// Per-cycle persistence factor for event items (default: 0.90)
    #[serde(default = "default_event_persistence")]
    pub event_persistence: f32,
    /// Per-cycle persistence factor for uncategorized items (default: 0.85)
    #[serde(default = "default_other_persistence")]
    pub other_persistence: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            long_history_turns: default_long_history_turns(),
            long_history_bonus: default_long_history_bonus(),
            short_history_turns: default_short_history_turns(),
            short_history_bonus: default_short_history_bonus(),
            open_question_bonus: default_open_question_bonus(),
            followup_bonus: default_followup_bonus(),
            recent_bonus: default_recent_bonus(),
            recent_window_secs: default_recent_window_secs(),
            conversation_persistence: default_conversation_persistence(),
            preference_persistence: default_preference_persistence(),
            event_persistence: default_event_persistence(),
            other_persistence: default_other_persistence(),
        }
    }
}

fn default_long_history_turns() -> u32 {
    10
}

fn default_long_history_bonus() -> f32 {
    1.0
}

fn default_short_history_turns() -> u32 {
    5
}

fn default_short_history_bonus() -> f32 {
    0.5
}

fn default_open_question_bonus() -> f32 {
    0.5
}

fn default_followup_bonus() -> f32 {
    0.5
}

fn default_recent_bonus() -> f32 {
    0.5
}

fn default_recent_window_secs() -> u64 {
    3600
}

fn default_conversation_persistence() -> f32 {
    0.95
}

fn default_preference_persistence() -> f32 {
    0.99
}

fn default_event_persistence() -> f32 {
    0.90
}

fn default_other_persistence() -> f32 {
    0.85
}

impl ScorerConfig {
    /// Persistence factor for one item category, clamped to the
    /// 0.8..=0.99 range the decay model assumes.
    pub fn persistence_factor(&self, category: ItemCategory) -> f32 {
        let factor = match category {
            ItemCategory::Conversation => self.conversation_persistence,
            ItemCategory::Preference => self.preference_persistence,
            ItemCategory::Event => self.event_persistence,
            ItemCategory::Other => self.other_persistence,
        };
        factor.clamp(0.8, 0.99)
    }
}

/// Score a conversation snapshot.
///
/// Starts from LOW and stacks activity bonuses:
/// - long histories earn the full bonus, moderate histories half
/// - open questions and pending followups each add a fixed bonus
/// - recent interaction (within the configured window) adds a fixed bonus
///
/// The result is capped at CRITICAL.
pub fn score_conversation(snapshot: &ConversationSnapshot, config: &ScorerConfig) -> f32 {
    let mut score = LOW;

    if snapshot.turn_count >= config.long_history_turns {
        score += config.long_history_bonus;
    } else if snapshot.turn_count >= config.short_history_turns {
        score += config.short_history_bonus;
    }

    if snapshot.unanswered_questions > 0 {
        score += config.open_question_bonus;
    }

    if snapshot.pending_followups > 0 {
        score += config.followup_bonus;
    }

    let recent_window = Duration::seconds(config.recent_window_secs as i64);
    if Utc::now() - snapshot.last_interaction <= recent_window {
        score += config.recent_bonus;
    }

    score.min(CRITICAL)
}

/// Apply one cycle of persistence decay to an unrefreshed item's score.
pub fn decay_score(score: f32, category: ItemCategory, config: &ScorerConfig) -> f32 {
    score * config.persistence_factor(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(turns: u32, questions: u32, followups: u32, minutes_ago: i64) -> ConversationSnapshot {
        ConversationSnapshot {
            turn_count: turns,
            unanswered_questions: questions,
            pending_followups: followups,
            last_interaction: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_scorer_config_default() {
        let config = ScorerConfig::default();
        assert_eq!(config.long_history_turns, 10);
        assert_eq!(config.long_history_bonus, 1.0);
        assert_eq!(config.short_history_turns, 5);
        assert_eq!(config.short_history_bonus, 0.5);
        assert_eq!(config.recent_window_secs, 3600);
        assert_eq!(config.conversation_persistence, 0.95);
        assert_eq!(config.preference_persistence, 0.99);
    }

    #[test]
    fn test_base_score_is_low() {
        let config = ScorerConfig::default();
        // One stale turn: no history, question, followup, or recency bonus
        let score = score_conversation(&snapshot(1, 0, 0, 120), &config);
        assert_eq!(score, LOW);
    }

    #[test]
    fn test_long_history_bonus() {
        let config = ScorerConfig::default();
        let score = score_conversation(&snapshot(12, 0, 0, 120), &config);
        assert_eq!(score, LOW + 1.0);
        assert!(score >= 3.0, "twelve turns should reach at least 3.0");
    }

    #[test]
    fn test_short_history_bonus() {
        let config = ScorerConfig::default();
        let score = score_conversation(&snapshot(6, 0, 0, 120), &config);
        assert_eq!(score, LOW + 0.5);
    }

    #[test]
    fn test_history_bonuses_do_not_stack() {
        let config = ScorerConfig::default();
        let long = score_conversation(&snapshot(20, 0, 0, 120), &config);
        assert_eq!(long, LOW + config.long_history_bonus);
    }

    #[test]
    fn test_question_and_followup_bonuses() {
        let config = ScorerConfig::default();
        let questions = score_conversation(&snapshot(1, 2, 0, 120), &config);
        assert_eq!(questions, LOW + 0.5);

        let followups = score_conversation(&snapshot(1, 0, 1, 120), &config);
        assert_eq!(followups, LOW + 0.5);

        let both = score_conversation(&snapshot(1, 2, 1, 120), &config);
        assert_eq!(both, LOW + 1.0);
    }

    #[test]
    fn test_recent_interaction_bonus() {
        let config = ScorerConfig::default();
        let recent = score_conversation(&snapshot(1, 0, 0, 5), &config);
        let stale = score_conversation(&snapshot(1, 0, 0, 90), &config);
        assert_eq!(recent, LOW + 0.5);
        assert_eq!(stale, LOW);
    }

    #[test]
    fn test_score_capped_at_critical() {
        let config = ScorerConfig {
            long_history_bonus: 3.0,
            ..ScorerConfig::default()
        };
        let score = score_conversation(&snapshot(15, 1, 1, 5), &config);
        assert_eq!(score, CRITICAL);
    }

    #[test]
    fn test_all_bonuses_combined() {
        let config = ScorerConfig::default();
        let score = score_conversation(&snapshot(12, 1, 1, 5), &config);
        assert_eq!(score, LOW + 1.0 + 0.5 + 0.5 + 0.5);
    }

    #[test]
    fn test_importance_from_score() {
        assert_eq!(importance_from_score(0.2), 1);
        assert_eq!(importance_from_score(2.4), 2);
        assert_eq!(importance_from_score(2.5), 3);
        assert_eq!(importance_from_score(3.0), 3);
        assert_eq!(importance_from_score(4.6), 5);
        assert_eq!(importance_from_score(9.0), 5);
    }

    #[test]
    fn test_persistence_factor_per_category() {
        let config = ScorerConfig::default();
        assert_eq!(
            config.persistence_factor(ItemCategory::Preference),
            0.99
        );
        assert_eq!(
            config.persistence_factor(ItemCategory::Conversation),
            0.95
        );
        assert_eq!(config.persistence_factor(ItemCategory::Event), 0.90);
        assert_eq!(config.persistence_factor(ItemCategory::Other), 0.85);
    }

    #[test]
    fn test_persistence_factor_clamped() {
        let config = ScorerConfig {
            event_persistence: 0.2,
            preference_persistence: 1.5,
            ..ScorerConfig::default()
        };
        assert_eq!(config.persistence_factor(ItemCategory::Event), 0.8);
        assert_eq!(config.persistence_factor(ItemCategory::Preference), 0.99);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let config = ScorerConfig::default();
        let mut score = 4.0;
        for _ in 0..10 {
            let next = decay_score(score, ItemCategory::Conversation, &config);
            assert!(next < score, "decay must strictly reduce an untouched score");
            score = next;
        }
    }

    #[test]
    fn test_decay_preserves_category_ordering() {
        let config = ScorerConfig::default();
        let preference = decay_score(3.0, ItemCategory::Preference, &config);
        let other = decay_score(3.0, ItemCategory::Other, &config);
        assert!(
            preference > other,
            "preferences should outlive uncategorized items"
        );
    }
}
