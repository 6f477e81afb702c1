//! Entity extraction from memory payloads
//!
//! Extraction sits behind a trait so the heuristic can be swapped for a
//! model-backed extractor without touching storage or consolidation.

use std::collections::BTreeSet;

use serde_json::Value;

/// Produces the entity set for a memory from its content and context.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, content: &Value, context: &Value) -> BTreeSet<String>;
}

/// Fields whose string values are treated as prose and scanned for
/// capitalized names.
const TEXT_FIELDS: &[&str] = &[
    "text",
    "summary",
    "value",
    "description",
    "title",
    "notes",
    "key_points",
];

/// Words that look like names to the capitalization scan but never are.
const NAME_STOPWORDS: &[&str] = &["I", "I'm", "I'll", "I've", "I'd"];

/// Rule-based extractor.
///
/// Collects explicit `entities` and `topics` lists, `location`/`place`
/// fields, and capitalized name runs found in prose fields. Scanning is
/// recursive over nested objects and arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    fn walk(&self, value: &Value, entities: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    match key.as_str() {
                        "entities" | "topics" => collect_list(child, entities),
                        "location" | "place" => {
                            if let Value::String(s) = child {
                                push_entity(s, entities);
                            }
                        }
                        _ if TEXT_FIELDS.contains(&key.as_str()) => {
                            collect_prose(child, entities);
                        }
                        _ => self.walk(child, entities),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, entities);
                }
            }
            _ => {}
        }
    }
}

impl EntityExtractor for HeuristicExtractor {
    fn extract(&self, content: &Value, context: &Value) -> BTreeSet<String> {
        let mut entities = BTreeSet::new();

        for value in [content, context] {
            if let Value::String(s) = value {
                scan_names(s, &mut entities);
            } else {
                self.walk(value, &mut entities);
            }
        }

        entities
    }
}

fn collect_list(value: &Value, entities: &mut BTreeSet<String>) {
    if let Value::Array(items) = value {
        for item in items {
            if let Value::String(s) = item {
                push_entity(s, entities);
            }
        }
    } else if let Value::String(s) = value {
        push_entity(s, entities);
    }
}

fn collect_prose(value: &Value, entities: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => scan_names(s, entities),
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    scan_names(s, entities);
                }
            }
        }
        _ => {}
    }
}

fn push_entity(raw: &str, entities: &mut BTreeSet<String>) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        entities.insert(trimmed.to_string());
    }
}

/// Scan prose for capitalized name runs.
///
/// Consecutive capitalized words form one candidate ("Eiffel Tower").
/// A single capitalized word at the start of a sentence is treated as
/// sentence case and dropped; multi-word runs are kept wherever they
/// begin.
fn scan_names(text: &str, entities: &mut BTreeSet<String>) {
    let mut run: Vec<&str> = Vec::new();
    let mut run_at_sentence_start = false;
    let mut sentence_start = true;

    for token in text.split_whitespace() {
        let word = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        let ends_sentence = token.ends_with('.') || token.ends_with('!') || token.ends_with('?');

        if is_name_candidate(word) {
            if run.is_empty() {
                run_at_sentence_start = sentence_start;
            }
            run.push(word);
        } else {
            flush_run(&mut run, run_at_sentence_start, entities);
        }

        if ends_sentence {
            flush_run(&mut run, run_at_sentence_start, entities);
            sentence_start = true;
        } else {
            sentence_start = false;
        }
    }
    flush_run(&mut run, run_at_sentence_start, entities);
}

fn is_name_candidate(word: &str) -> bool {
    if word.len() < 2 || NAME_STOPWORDS.contains(&word) {
        return false;
    }
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.is_uppercase())
        .unwrap_or(false)
        && chars.all(|c| c.is_alphanumeric() || c == '\'')
}

fn flush_run(run: &mut Vec<&str>, at_sentence_start: bool, entities: &mut BTreeSet<String>) {
    if run.is_empty() {
        return;
    }
    // Single sentence-initial capitalized words are just sentence case
    if !(at_sentence_start && run.len() == 1) {
        entities.insert(run.join(" "));
    }
    run.clear();
}
