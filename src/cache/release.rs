//! Resource Release Module
//!
//! Defines the capability a cached value implements so the cache can hand
//! it back for release exactly once when it leaves.

use serde::Serialize;

// == Removal Cause ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// Evicted as least recently used to bring the cache back under capacity
    Evicted,
    /// Displaced by a `put` with the same key
    Replaced,
    /// Removed by an explicit `evict(key)`
    Explicit,
    /// Removed by `evict_all` or `dispose`
    Cleared,
}

impl RemovalCause {
    /// Returns true if the removal was driven by capacity pressure.
    pub fn was_evicted(&self) -> bool {
        matches!(self, RemovalCause::Evicted)
    }
}

// == Release Trait ==
/// Release action for a cached resource.
///
/// The cache takes ownership of a value on `put` and passes it by value to
/// `release` when the entry leaves for any reason, so a value can never be
/// released twice.
///
/// `release` runs while the cache's internal lock is held. Implementations
/// must not call back into the cache that is releasing them; doing so
/// deadlocks.
pub trait Release {
    fn release(self, cause: RemovalCause);
}

impl Release for Vec<u8> {
    fn release(self, _cause: RemovalCause) {}
}

impl Release for String {
    fn release(self, _cause: RemovalCause) {}
}
