use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

/// One-line preview of a memory payload. Prefers the prose field when
/// the payload is an object.
pub fn content_preview(value: &Value, max_len: usize) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    };
    truncate_string(text.replace('\n', " ").trim(), max_len)
}
