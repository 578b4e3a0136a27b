//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with size accounting.

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// A resident value together with its declared size.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Declared memory cost in accounting units
    pub size: u64,
    /// When the entry was inserted (or last replaced)
    pub inserted_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: V, size: u64) -> Self {
        Self {
            value,
            size,
            inserted_at: Utc::now(),
        }
    }

    /// Consumes the entry, returning the owned value.
    pub fn into_value(self) -> V {
        self.value
    }
}
