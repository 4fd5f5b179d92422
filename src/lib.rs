//! Session Cache - An in-process session container
//!
//! Provides key/value storage with a sliding TTL, LRU ordering and node reuse,
//! swept by a background reclaimer.

pub mod config;
pub mod error;
pub mod storage;
pub mod tasks;

pub use config::StorageConfig;
pub use error::{Result, StorageError};
pub use storage::{Storage, StorageStats, SweepReport};
