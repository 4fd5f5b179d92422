//! Storage Module
//!
//! Thread-safe facade over the engine, paired with its background reclaimer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::config::{validate_gc_interval, StorageConfig};
use crate::error::Result;
use crate::storage::engine::{Engine, SweepReport};
use crate::storage::node::current_timestamp;
use crate::storage::stats::StorageStats;
use crate::tasks::{Reclaimer, Sweep};

impl<V: Send + Sync + 'static> Sweep for Mutex<Engine<V>> {
    fn sweep(&self) -> SweepReport {
        let now = current_timestamp();
        self.lock().sweep(now)
    }
}

// == Storage ==
/// In-process key/value storage with a sliding TTL.
///
/// Every operation takes one lock around the whole engine, so operations are
/// atomic with respect to each other and to the reclaimer. Values are stored
/// behind `Arc` and handed back by reference.
///
/// NOTE: keep the working set to roughly 100,000 entries; beyond that an
/// external cache is the better tool.
///
/// # Example
/// ```ignore
/// let sessions: Storage<Session> = Storage::new(1800, 10_000, Duration::from_secs(60))?;
/// sessions.set("sid", session)?;
/// let session = sessions.get("sid")?;
/// ```
#[derive(Debug)]
pub struct Storage<V> {
    engine: Arc<Mutex<Engine<V>>>,
    reclaimer: Reclaimer,
}

impl<V: Send + Sync + 'static> Storage<V> {
    // == Constructor ==
    /// Creates the storage and starts its reclaimer on the current tokio runtime.
    ///
    /// # Arguments
    /// * `max_age` - Sliding TTL in seconds, at most 60 years; cannot be changed later
    /// * `capacity` - Target number of node slots (live + idle)
    /// * `gc_interval` - Reclaimer interval, at least one second
    ///
    /// # Errors
    /// `InvalidConfiguration` for out-of-range parameters or when called
    /// outside a tokio runtime.
    pub fn new(max_age: u64, capacity: usize, gc_interval: Duration) -> Result<Self> {
        validate_gc_interval(gc_interval)?;
        let engine = Arc::new(Mutex::new(Engine::new(max_age, capacity)?));
        let reclaimer = Reclaimer::spawn(Arc::downgrade(&engine), gc_interval)?;

        info!(
            "Storage initialized: max_age={}s, capacity={}, gc_interval={:?}",
            max_age, capacity, gc_interval
        );
        Ok(Self { engine, reclaimer })
    }

    /// Creates the storage from a loaded configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.max_age, config.capacity, config.gc_interval_duration())
    }

    // == Add ==
    /// Stores `value` under `key` unless a live entry already holds it.
    ///
    /// An expired entry under `key` counts as absent and is overwritten.
    pub fn add(&self, key: &str, value: impl Into<Arc<V>>) -> Result<()> {
        let now = current_timestamp();
        self.engine.lock().add(key, value.into(), now)
    }

    // == Set ==
    /// Stores `value` under `key`, overwriting any entry.
    pub fn set(&self, key: &str, value: impl Into<Arc<V>>) -> Result<()> {
        let now = current_timestamp();
        self.engine.lock().set(key, value.into(), now)
    }

    // == Get ==
    /// Returns the value under `key` and extends its lifetime by `max_age`.
    ///
    /// Fails with `NotFound` if the key is absent or expired; an expired
    /// entry is removed immediately.
    pub fn get(&self, key: &str) -> Result<Arc<V>> {
        let now = current_timestamp();
        self.engine.lock().get(key, now)
    }

    // == Delete ==
    /// Removes `key`. `NotFound` is advisory and can normally be ignored.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.engine.lock().delete(key)
    }

    /// Returns the number of live entries, expired ones not yet swept included.
    pub fn len(&self) -> usize {
        self.engine.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.engine.lock().capacity()
    }

    /// Changes the target slot count.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        self.engine.lock().set_capacity(capacity)
    }

    /// Sliding TTL in seconds.
    pub fn max_age(&self) -> u64 {
        self.engine.lock().max_age()
    }

    /// Live keys, most recently touched first.
    pub fn keys(&self) -> Vec<String> {
        self.engine.lock().keys()
    }

    pub fn stats(&self) -> StorageStats {
        self.engine.lock().stats()
    }

    // == GC ==
    /// Runs one sweep now, outside the reclaimer schedule.
    pub fn gc(&self) -> SweepReport {
        self.engine.sweep()
    }

    // == Set GC Interval ==
    /// Replaces the reclaimer interval, then sweeps once immediately.
    ///
    /// Avoid calling this at peak load because of the extra sweep.
    pub async fn set_gc_interval(&self, gc_interval: Duration) -> Result<()> {
        validate_gc_interval(gc_interval)?;
        self.reclaimer.reschedule(gc_interval).await?;
        self.gc();
        Ok(())
    }

    // == Shutdown ==
    /// Stops the reclaimer. The storage stays usable; expired entries are
    /// then only removed on access or by [`Storage::gc`].
    pub async fn shutdown(&self) {
        self.reclaimer.shutdown().await;
    }

    /// Returns true while the reclaimer task is alive.
    pub fn reclaimer_running(&self) -> bool {
        self.reclaimer.is_running()
    }
}
