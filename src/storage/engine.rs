//! Storage Engine Module
//!
//! Index, live list and free list combined into a sliding-TTL LRU engine.
//!
//! ```text
//!                    front                          back
//!                   +------+       +------+       +------+
//!   lru list        | key  |------>| key  |------>| key  |
//!                   | value|<------| value|<------| value|
//!                   +------+       +------+       +------+
//!                       ^              ^              ^
//!   index: key -> id ---+--------------+--------------+
//!
//!                   +------+       +------+
//!   free list       |      |------>|      |    idle nodes kept for reuse
//!                   +------+       +------+
//! ```
//!
//! Every method takes the current time explicitly; locking and clock reads
//! live in [`Storage`](crate::storage::Storage).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{validate_capacity, validate_max_age};
use crate::error::{Result, StorageError};
use crate::storage::list::IntrusiveList;
use crate::storage::node::{Arena, NodeId};
use crate::storage::stats::StorageStats;

/// Live-list length at which admission refuses to grow.
const LIVE_LIMIT: usize = isize::MAX as usize;

/// Backing slots allowed per allocated node before a sweep repacks the arena.
const SLOT_SLACK: usize = 2;

// == Sweep Report ==
/// Outcome of one expiry sweep plus capacity trim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired entries removed from the back of the live list
    pub expired: usize,
    /// Nodes physically dropped (per-removal and bulk trim)
    pub discarded: usize,
    /// Live entries after the sweep
    pub live: usize,
    /// Idle nodes after the sweep
    pub free: usize,
}

// == Engine ==
/// Single-threaded cache engine.
///
/// Principle:
/// 1. `index.len() == lru.len()`;
/// 2. for every node `n` of `lru`, `index[n.key] == n`;
/// 3. in `lru`, younger nodes are always in front of older ones, so expired
///    entries are contiguous at the back;
/// 4. nodes of `free` are idle and never indexed.
#[derive(Debug)]
pub struct Engine<V> {
    arena: Arena<V>,
    index: HashMap<String, NodeId>,
    lru: IntrusiveList,
    free: IntrusiveList,
    capacity: usize,
    max_age: i64,
    live_limit: usize,
    stats: StorageStats,
}

impl<V> Engine<V> {
    // == Constructor ==
    /// Creates an empty engine.
    ///
    /// # Arguments
    /// * `max_age` - Sliding TTL in seconds, in `(0, MAX_AGE_LIMIT]`
    /// * `capacity` - Target number of node slots, > 0
    pub fn new(max_age: u64, capacity: usize) -> Result<Self> {
        validate_max_age(max_age)?;
        validate_capacity(capacity)?;

        Ok(Self {
            arena: Arena::new(),
            index: HashMap::with_capacity(64),
            lru: IntrusiveList::new(),
            free: IntrusiveList::new(),
            capacity,
            // bounded by MAX_AGE_LIMIT
            max_age: max_age as i64,
            live_limit: LIVE_LIMIT,
            stats: StorageStats::new(),
        })
    }

    /// Lowers the admission bound so that it can be reached in tests.
    #[cfg(test)]
    pub(crate) fn with_live_limit(mut self, live_limit: usize) -> Self {
        self.live_limit = live_limit;
        self
    }

    // == Add ==
    /// Inserts `key` only if it is absent or its entry has expired.
    pub fn add(&mut self, key: &str, value: Arc<V>, now: i64) -> Result<()> {
        self.upsert(key, value, now, false)
    }

    // == Set ==
    /// Inserts or overwrites `key` unconditionally.
    pub fn set(&mut self, key: &str, value: Arc<V>, now: i64) -> Result<()> {
        self.upsert(key, value, now, true)
    }

    fn upsert(
        &mut self,
        key: &str,
        value: Arc<V>,
        now: i64,
        overwrite_live: bool,
    ) -> Result<()> {
        if let Some(&id) = self.index.get(key) {
            let node = &mut self.arena[id];
            if !overwrite_live && !node.is_expired(now) {
                return Err(StorageError::AlreadyExists(key.to_string()));
            }

            node.value = Some(value);
            node.expiration = now + self.max_age;
            self.lru.move_to_front(&mut self.arena, id);
            return Ok(());
        }

        self.admit(key, value, now)
    }

    // == Admit ==
    /// Finds a node for an absent key: expired tail first, then the free
    /// list, then a fresh allocation.
    fn admit(&mut self, key: &str, value: Arc<V>, now: i64) -> Result<()> {
        let expiration = now + self.max_age;

        if let Some(back) = self.lru.back() {
            if self.arena[back].is_expired(now) {
                let node = &mut self.arena[back];
                self.index.remove(node.key.as_str());
                node.fill(key, value, expiration);

                self.lru.move_to_front(&mut self.arena, back);
                self.index.insert(key.to_string(), back);
                self.stats.record_expired();
                self.stats.record_recycle();
                return Ok(());
            }
        }

        if self.lru.len() >= self.live_limit {
            return Err(StorageError::CapacityExhausted);
        }

        let id = match self.free.pop_front(&mut self.arena) {
            Some(id) => {
                self.stats.record_recycle();
                id
            }
            None => {
                self.stats.record_allocation();
                self.arena.allocate()
            }
        };

        self.arena[id].fill(key, value, expiration);
        self.lru.push_front(&mut self.arena, id);
        self.index.insert(key.to_string(), id);
        Ok(())
    }

    // == Get ==
    /// Returns the value of `key` and slides its expiration.
    ///
    /// An expired entry is removed on the spot and reported as missing.
    pub fn get(&mut self, key: &str, now: i64) -> Result<Arc<V>> {
        let id = match self.index.get(key) {
            Some(&id) => id,
            None => {
                self.stats.record_miss();
                return Err(StorageError::NotFound(key.to_string()));
            }
        };

        if self.arena[id].is_expired(now) {
            self.remove(id);
            self.stats.record_expired();
            self.stats.record_miss();
            return Err(StorageError::NotFound(key.to_string()));
        }

        let node = &mut self.arena[id];
        node.expiration = now + self.max_age;
        let value = node.value.clone();
        self.lru.move_to_front(&mut self.arena, id);

        match value {
            Some(value) => {
                self.stats.record_hit();
                Ok(value)
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    // == Delete ==
    /// Removes `key` whether or not its entry has expired.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let id = match self.index.get(key) {
            Some(&id) => id,
            None => return Err(StorageError::NotFound(key.to_string())),
        };

        self.remove(id);
        Ok(())
    }

    // == Remove ==
    /// Unlinks a live node, clears it, then either parks it in the free list
    /// or drops it when the pool is oversized and demand has fallen.
    fn remove(&mut self, id: NodeId) {
        self.lru.remove(&mut self.arena, id);
        let node = &mut self.arena[id];
        self.index.remove(node.key.as_str());
        node.clear();

        // the detached node still counts as a slot
        let total = self.lru.len() + self.free.len() + 1;
        if total > self.capacity && self.below_low_water() {
            self.arena.discard(id);
            self.stats.record_discards(1);
        } else {
            self.free.push_front(&mut self.arena, id);
        }
    }

    /// Live occupancy is under `capacity - capacity/5`.
    fn below_low_water(&self) -> bool {
        self.lru.len() < self.capacity - self.capacity / 5
    }

    // == Sweep ==
    /// Removes expired entries from the back of the live list, then trims
    /// the free list back to capacity.
    pub fn sweep(&mut self, now: i64) -> SweepReport {
        let discarded_before = self.stats.discarded;
        let mut expired = 0;

        while let Some(back) = self.lru.back() {
            if !self.arena[back].is_expired(now) {
                break;
            }
            self.remove(back);
            self.stats.record_expired();
            expired += 1;
        }

        self.trim();

        let discarded = (self.stats.discarded - discarded_before) as usize;
        self.arena.compact();
        if self.arena.slot_count() > SLOT_SLACK * self.arena.allocated() {
            self.repack();
        }

        SweepReport {
            expired,
            discarded,
            live: self.lru.len(),
            free: self.free.len(),
        }
    }

    // == Trim ==
    /// Drops idle nodes until the pool is back at capacity.
    ///
    /// Only runs once live occupancy has fallen below the hysteresis
    /// threshold, so a pool hovering at the boundary keeps its nodes.
    fn trim(&mut self) -> usize {
        if self.total_slots() <= self.capacity || !self.below_low_water() {
            return 0;
        }

        let mut dropped = 0;
        while self.total_slots() > self.capacity {
            match self.free.pop_front(&mut self.arena) {
                Some(id) => {
                    self.arena.discard(id);
                    dropped += 1;
                }
                None => break,
            }
        }

        if dropped > 0 {
            self.stats.record_discards(dropped);
            debug!(
                "Capacity trim: discarded {} idle nodes (live={}, free={}, capacity={})",
                dropped,
                self.lru.len(),
                self.free.len(),
                self.capacity
            );
        }
        dropped
    }

    // == Repack ==
    /// Moves every node into a fresh arena sized to the pool, keeping list
    /// order, and points the index at the new handles.
    ///
    /// Runs when surviving nodes hold high handles after a large discard, which
    /// tail compaction alone cannot release.
    fn repack(&mut self) {
        let live: Vec<NodeId> = self.lru.iter(&self.arena).collect();
        let idle: Vec<NodeId> = self.free.iter(&self.arena).collect();
        let before = self.arena.slot_count();

        let mut arena = Arena::with_capacity(live.len() + idle.len());
        let mut lru = IntrusiveList::new();
        let mut free = IntrusiveList::new();

        for &old in live.iter().rev() {
            let Some(node) = self.arena.take(old) else {
                continue;
            };
            let id = arena.insert(node);
            if let Some(slot) = self.index.get_mut(arena[id].key.as_str()) {
                *slot = id;
            }
            lru.push_front(&mut arena, id);
        }
        for &old in idle.iter().rev() {
            if let Some(node) = self.arena.take(old) {
                let id = arena.insert(node);
                free.push_front(&mut arena, id);
            }
        }

        self.arena = arena;
        self.lru = lru;
        self.free = free;
        self.index.shrink_to(self.capacity);

        debug!(
            "Arena repacked: {} slots down to {}",
            before,
            self.arena.slot_count()
        );
    }

    // == Accessors ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Returns the number of idle nodes kept for reuse.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    fn total_slots(&self) -> usize {
        self.lru.len() + self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the target slot count. The pool converges on the next removals
    /// and sweeps.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        validate_capacity(capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    /// Sliding TTL in seconds.
    pub fn max_age(&self) -> u64 {
        self.max_age as u64
    }

    /// Live keys, most recently touched first.
    pub fn keys(&self) -> Vec<String> {
        self.lru
            .iter(&self.arena)
            .map(|id| self.arena[id].key.clone())
            .collect()
    }

    // == Stats ==
    /// Returns counters plus the current occupancy.
    pub fn stats(&self) -> StorageStats {
        let mut stats = self.stats.clone();
        stats.live = self.lru.len();
        stats.free = self.free.len();
        stats.capacity = self.capacity;
        stats
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.arena.slot_count()
    }

    /// Panics if any structural invariant is broken.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.index.len(), self.lru.len(), "index and lru list disagree");
        assert_eq!(
            self.arena.allocated(),
            self.lru.len() + self.free.len(),
            "arena holds nodes outside both lists"
        );

        let mut previous_expiration = i64::MAX;
        let mut walked = 0;
        for id in self.lru.iter(&self.arena) {
            let node = &self.arena[id];
            assert_eq!(self.index.get(&node.key), Some(&id), "index[{}] is stale", node.key);
            assert!(!node.is_idle(), "live node without value");
            assert!(
                node.expiration <= previous_expiration,
                "expirations are not monotonic front to back"
            );
            previous_expiration = node.expiration;
            walked += 1;
        }
        assert_eq!(walked, self.lru.len());

        let mut idle = 0;
        for id in self.free.iter(&self.arena) {
            let node = &self.arena[id];
            assert!(node.is_idle() && node.key.is_empty(), "free node still holds an entry");
            idle += 1;
        }
        assert_eq!(idle, self.free.len());
    }
}
