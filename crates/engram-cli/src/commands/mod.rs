pub mod consolidate;
pub mod entity;
pub mod memory;
pub mod stats;
pub mod timeline;

pub use consolidate::ConsolidateCommand;
pub use entity::EntityCommand;
pub use memory::MemoryCommand;
pub use stats::StatsCommand;
pub use timeline::TimelineCommand;
