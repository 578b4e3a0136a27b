//! Snapshot DTOs
//!
//! Serializable point-in-time views of the cache and its controller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;

/// One resident entry as seen by `SizeBoundedLruCache::snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo<K> {
    pub key: K,
    /// Declared size in accounting units
    pub size: u64,
    pub inserted_at: DateTime<Utc>,
}

/// Describes one engine generation created by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationInfo {
    /// Monotonic generation number, starting at 1
    pub id: u64,
    /// Memory ceiling reported by the budget source, in bytes
    pub budget_bytes: u64,
    /// Capacity derived from the budget, in accounting units
    pub capacity: u64,
    pub created_at: DateTime<Utc>,
}

/// Full view of the live cache: generation, counters and LRU order
/// (least recently used first).
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot<K> {
    pub generation: GenerationInfo,
    pub stats: CacheStats,
    pub entries: Vec<EntryInfo<K>>,
}
