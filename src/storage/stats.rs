//! Storage Statistics Module
//!
//! Tracks hits, misses, expirations and slot reuse.

use serde::Serialize;

// == Storage Stats ==
/// Counters and occupancy snapshot for a storage engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads on absent or expired keys
    pub misses: u64,
    /// Number of entries removed because their TTL elapsed
    pub expired: u64,
    /// Admissions served by an existing node
    pub recycled: u64,
    /// Admissions that had to allocate a node
    pub allocated: u64,
    /// Nodes physically dropped by the capacity trim
    pub discarded: u64,
    /// Current number of live entries
    pub live: usize,
    /// Current number of idle nodes kept for reuse
    pub free: usize,
    /// Target slot count
    pub capacity: usize,
}

impl StorageStats {
    // == Constructor ==
    /// Creates a new StorageStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Live plus idle nodes.
    pub fn total_slots(&self) -> usize {
        self.live + self.free
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_expired(&mut self) {
        self.expired += 1;
    }

    pub(crate) fn record_recycle(&mut self) {
        self.recycled += 1;
    }

    pub(crate) fn record_allocation(&mut self) {
        self.allocated += 1;
    }

    pub(crate) fn record_discards(&mut self, count: usize) {
        self.discarded += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StorageStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.discarded, 0);
        assert_eq!(stats.total_slots(), 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = StorageStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = StorageStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_discards() {
        let mut stats = StorageStats::new();
        stats.record_discards(3);
        stats.record_discards(0);
        assert_eq!(stats.discarded, 3);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut stats = StorageStats::new();
        stats.record_allocation();
        stats.live = 1;
        stats.capacity = 8;

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["allocated"], 1);
        assert_eq!(json["live"], 1);
        assert_eq!(json["capacity"], 8);
    }
}
