//! Short-term memory tier
//!
//! Volatile per-user storage with lazy expiry, resource-mode retention
//! policies, and per-cycle persistence decay.

pub mod retention;
pub mod store;

pub use retention::{ResourceMode, RetentionPolicy, RetentionTable};
pub use store::{PruneOutcome, ShortTermStore, StoreOptions, is_expired};
