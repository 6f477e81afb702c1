//! Durable record storage for the long-term tier

pub mod file;
pub mod memory;
pub mod record;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use record::RecordStore;
