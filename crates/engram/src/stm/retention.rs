//! Retention policies for the short-term store
//!
//! Each resource mode maps to a policy bounding how many items the store
//! may hold, how old they may grow, and how unimportant they may be.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::memory::importance;

/// Resource modes published by the platform's resource monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Minimal,
    Reduced,
    Normal,
    Extended,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceMode::Minimal => "minimal",
            ResourceMode::Reduced => "reduced",
            ResourceMode::Normal => "normal",
            ResourceMode::Extended => "extended",
        };
        write!(f, "{name}")
    }
}

/// Limits applied to the short-term store under one resource mode.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of items the store may hold
    pub max_items: usize,
    /// Maximum item age in milliseconds
    pub max_age_ms: u64,
    /// Items scoring below this are dropped
    pub min_importance: f32,
}

impl RetentionPolicy {
    pub fn new(max_items: usize, max_age_ms: u64, min_importance: f32) -> Self {
        Self {
            max_items,
            max_age_ms,
            min_importance,
        }
    }

    /// Maximum age as a chrono duration
    pub fn max_age(&self) -> Duration {
        Duration::milliseconds(self.max_age_ms as i64)
    }
}

/// Per-mode retention policies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RetentionTable {
    #[serde(default = "default_minimal")]
    pub minimal: RetentionPolicy,
    #[serde(default = "default_reduced")]
    pub reduced: RetentionPolicy,
    #[serde(default = "default_normal")]
    pub normal: RetentionPolicy,
    #[serde(default = "default_extended")]
    pub extended: RetentionPolicy,
}

impl Default for RetentionTable {
    fn default() -> Self {
        Self {
            minimal: default_minimal(),
            reduced: default_reduced(),
            normal: default_normal(),
            extended: default_extended(),
        }
    }
}

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

fn default_minimal() -> RetentionPolicy {
    RetentionPolicy::new(10, HOUR_MS, importance::HIGH)
}

fn default_reduced() -> RetentionPolicy {
    RetentionPolicy::new(50, 6 * HOUR_MS, importance::MEDIUM)
}

fn default_normal() -> RetentionPolicy {
    RetentionPolicy::new(200, 7 * DAY_MS, importance::LOW)
}

fn default_extended() -> RetentionPolicy {
    RetentionPolicy::new(1000, 30 * DAY_MS, importance::TRIVIAL)
}

impl RetentionTable {
    /// Look up the policy for a resource mode.
    pub fn policy(&self, mode: ResourceMode) -> &RetentionPolicy {
        match mode {
            ResourceMode::Minimal => &self.minimal,
            ResourceMode::Reduced => &self.reduced,
            ResourceMode::Normal => &self.normal,
            ResourceMode::Extended => &self.extended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = RetentionTable::default();
        assert_eq!(table.minimal.max_items, 10);
        assert_eq!(table.minimal.max_age_ms, HOUR_MS);
        assert_eq!(table.minimal.min_importance, importance::HIGH);

        assert_eq!(table.normal.max_items, 200);
        assert_eq!(table.normal.min_importance, importance::LOW);

        assert_eq!(table.extended.max_items, 1000);
        assert_eq!(table.extended.max_age_ms, 30 * DAY_MS);
        assert_eq!(table.extended.min_importance, importance::TRIVIAL);
    }

    #[test]
    fn test_policy_lookup() {
        let table = RetentionTable::default();
        assert_eq!(table.policy(ResourceMode::Minimal), &table.minimal);
        assert_eq!(table.policy(ResourceMode::Reduced), &table.reduced);
        assert_eq!(table.policy(ResourceMode::Normal), &table.normal);
        assert_eq!(table.policy(ResourceMode::Extended), &table.extended);
    }

    #[test]
    fn test_max_age_duration() {
        let policy = RetentionPolicy::new(10, HOUR_MS, 1.0);
        assert_eq!(policy.max_age(), Duration::hours(1));
    }

    #[test]
    fn test_resource_mode_display() {
        assert_eq!(ResourceMode::Minimal.to_string(), "minimal");
        assert_eq!(ResourceMode::Extended.to_string(), "extended");
    }

    #[test]
    fn test_resource_mode_deserializes_lowercase() {
        let mode: ResourceMode = serde_json::from_str("\"reduced\"").expect("Failed to parse");
        assert_eq!(mode, ResourceMode::Reduced);
    }

    #[test]
    fn test_table_toml_partial_override() {
        let toml_str = r#"
[minimal]
max_items = 5
max_age_ms = 600000
min_importance = 4.0
"#;
        let table: RetentionTable = toml::from_str(toml_str).expect("Failed to parse TOML");
        assert_eq!(table.minimal.max_items, 5);
        assert_eq!(table.minimal.max_age_ms, 600_000);
        // Unspecified modes fall back to defaults
        assert_eq!(table.normal.max_items, 200);
        assert_eq!(table.extended.max_items, 1000);
    }
}
