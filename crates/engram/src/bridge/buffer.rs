//! Live conversation state
//!
//! Per-conversation aggregates the bridge maintains in process. All
//! analysis here is heuristic, purely in-memory, and never suspends.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::curator::extractor::EntityExtractor;
use crate::memory::importance::ConversationSnapshot;
use crate::memory::types::ConversationSummary;

const MAX_KEY_POINTS: usize = 10;
const MAX_TRACKED_WORDS: usize = 256;
const TOPIC_MIN_LEN: usize = 5;
const TOPIC_MIN_COUNT: u32 = 2;
const TOP_TOPICS: usize = 5;

const FOLLOWUP_MARKERS: &[&str] = &[
    "i'll",
    "i will",
    "let me check",
    "remind me",
    "follow up",
    "get back to you",
];

const KEY_POINT_MARKERS: &[&str] = &["important", "remember", "don't forget", "deadline"];

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "good",
    "love",
    "excellent",
    "happy",
    "thanks",
    "perfect",
    "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "hate", "terrible", "awful", "wrong", "angry", "problem", "broken",
];

const TOPIC_STOPWORDS: &[&str] = &[
    "about", "after", "before", "because", "could", "going", "please", "really", "right", "should",
    "thanks", "their", "there", "these", "thing", "things", "think", "those", "where", "which",
    "while", "would",
];

/// Mutable per-conversation aggregates.
///
/// Tracks the activity counters the importance scorer consumes and the
/// descriptive fields that make up a [`ConversationSummary`]. Bounded
/// by construction: key points and tracked topic words are capped.
#[derive(Debug, Clone)]
pub struct ConversationState {
    id: String,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    message_count: u32,
    unanswered_questions: u32,
    pending_followups: u32,
    sentiment_total: f32,
    word_counts: HashMap<String, u32>,
    entities: BTreeSet<String>,
    key_points: Vec<String>,
}

impl ConversationState {
    pub fn new(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at,
            last_activity: started_at,
            message_count: 0,
            unanswered_questions: 0,
            pending_followups: 0,
            sentiment_total: 0.0,
            word_counts: HashMap::new(),
            entities: BTreeSet::new(),
            key_points: Vec::new(),
        }
    }

    /// Rebuild live state from a previously stored summary. Question and
    /// followup counters are transient and restart at zero; restored
    /// topics are seeded so they keep ranking.
    pub fn from_summary(summary: &ConversationSummary) -> Self {
        let mut word_counts = HashMap::new();
        for topic in &summary.topics {
            word_counts.insert(topic.clone(), TOPIC_MIN_COUNT);
        }
        Self {
            id: summary.conversation_id.clone(),
            started_at: summary.started_at,
            last_activity: summary.last_activity,
            message_count: summary.message_count,
            unanswered_questions: 0,
            pending_followups: 0,
            sentiment_total: summary.sentiment * summary.message_count as f32,
            word_counts,
            entities: summary.entities.iter().cloned().collect(),
            key_points: summary.key_points.clone(),
        }
    }

    /// Fold one message into the aggregates.
    pub fn record_message(&mut self, text: &str, at: DateTime<Utc>, extractor: &dyn EntityExtractor) {
        self.message_count += 1;
        self.last_activity = at;

        let trimmed = text.trim();
        if trimmed.ends_with('?') {
            self.unanswered_questions += 1;
        } else {
            // A plain statement settles the most recent open question
            self.unanswered_questions = self.unanswered_questions.saturating_sub(1);
        }

        let lower = text.to_lowercase();
        if FOLLOWUP_MARKERS.iter().any(|marker| lower.contains(marker)) {
            self.pending_followups += 1;
        }
        if KEY_POINT_MARKERS.iter().any(|marker| lower.contains(marker))
            && self.key_points.len() < MAX_KEY_POINTS
        {
            self.key_points.push(trimmed.to_string());
        }

        self.sentiment_total += message_sentiment(&lower);
        self.note_topics(&lower);
        self.entities
            .extend(extractor.extract(&Value::String(text.to_string()), &Value::Null));
    }

    fn note_topics(&mut self, lower: &str) {
        for token in lower.split_whitespace() {
            let word: String = token.chars().filter(|c| c.is_alphabetic()).collect();
            if word.len() < TOPIC_MIN_LEN || TOPIC_STOPWORDS.contains(&word.as_str()) {
                continue;
            }
            if let Some(count) = self.word_counts.get_mut(&word) {
                *count += 1;
            } else if self.word_counts.len() < MAX_TRACKED_WORDS {
                self.word_counts.insert(word, 1);
            }
        }
    }

    fn top_topics(&self) -> Vec<String> {
        let mut ranked: Vec<(&String, u32)> = self
            .word_counts
            .iter()
            .filter(|(_, count)| **count >= TOPIC_MIN_COUNT)
            .map(|(word, count)| (word, *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(TOP_TOPICS)
            .map(|(word, _)| word.clone())
            .collect()
    }

    fn mean_sentiment(&self) -> f32 {
        if self.message_count == 0 {
            0.0
        } else {
            self.sentiment_total / self.message_count as f32
        }
    }

    /// Activity signals for the importance scorer.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            turn_count: self.message_count,
            unanswered_questions: self.unanswered_questions,
            pending_followups: self.pending_followups,
            last_interaction: self.last_activity,
        }
    }

    /// The storable summary of this conversation.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            conversation_id: self.id.clone(),
            started_at: self.started_at,
            last_activity: self.last_activity,
            topics: self.top_topics(),
            message_count: self.message_count,
            sentiment: self.mean_sentiment(),
            key_points: self.key_points.clone(),
            entities: self.entities.iter().cloned().collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }
}

/// Mean polarity of sentiment-bearing words in one message, in [-1, 1].
fn message_sentiment(lower: &str) -> f32 {
    let mut positive = 0i32;
    let mut negative = 0i32;
    for token in lower.split_whitespace() {
        let word = token.trim_matches(|c: char| !c.is_alphanumeric());
        if POSITIVE_WORDS.contains(&word) {
            positive += 1;
        }
        if NEGATIVE_WORDS.contains(&word) {
            negative += 1;
        }
    }
    let matched = positive + negative;
    if matched == 0 {
        0.0
    } else {
        (positive - negative) as f32 / matched as f32
    }
}
