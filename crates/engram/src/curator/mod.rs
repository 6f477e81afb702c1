//! Long-term memory tier
//!
//! The curator owns durable memories: creation with entity extraction,
//! filtered retrieval, consolidation, and aggregate views.

pub mod consolidate;
pub mod extractor;
pub mod filter;
pub mod store;
pub mod timeline;

pub use consolidate::{ConsolidationConfig, ConsolidationOutcome, Consolidator};
pub use extractor::{EntityExtractor, HeuristicExtractor};
pub use filter::{MemoryFilter, SortOrder};
pub use store::{Curator, CuratorStats, MemoryContext};
pub use timeline::{EntitySummary, TimeRange, TimelineDay};
