//! Storage Module
//!
//! In-memory key/value storage with a sliding TTL, LRU ordering and node
//! reuse through a free list.

mod engine;
mod list;
mod node;
mod stats;
mod store;


// Re-export public types
pub use engine::{Engine, SweepReport};
pub use stats::StorageStats;
pub use store::Storage;
