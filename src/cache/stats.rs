//! Cache Statistics Module
//!
//! Tracks cache performance metrics and capacity accounting.

use serde::Serialize;

use crate::cache::RemovalCause;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of lookups that found a resident entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of successful `put` calls
    pub puts: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Number of entries displaced by a `put` with the same key
    pub replacements: u64,
    /// Number of entries removed by explicit `evict(key)`
    pub removals: u64,
    /// Current number of entries in the cache
    pub entry_count: usize,
    /// Sum of the declared sizes of resident entries
    pub current_size: u64,
    /// Capacity ceiling on `current_size`
    pub capacity: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of capacity in use (0.0 for a zero-capacity cache).
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.current_size as f64 / self.capacity as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_put(&mut self) {
        self.puts += 1;
    }

    // == Record Removal ==
    /// Increments the counter matching why an entry left.
    ///
    /// Cleared entries are not counted; a full clear is a lifecycle event.
    pub fn record_removal(&mut self, cause: RemovalCause) {
        match cause {
            RemovalCause::Evicted => self.evictions += 1,
            RemovalCause::Replaced => self.replacements += 1,
            RemovalCause::Explicit => self.removals += 1,
            RemovalCause::Cleared => {}
        }
    }
}
