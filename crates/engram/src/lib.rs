//! Engram - Tiered memory engine with promotion and consolidation
//!
//! This crate manages a volatile short-term tier and a durable long-term
//! tier per user, promoting items between them on importance scores,
//! retention policies, and access patterns.

pub mod bridge;
pub mod collaborators;
pub mod config;
pub mod curator;
pub mod engine;
pub mod error;
pub mod events;
pub mod memory;
pub mod promotion;
pub mod stm;
pub mod storage;
pub mod testing;

pub use engine::MemoryEngine;
pub use error::EngramError;
