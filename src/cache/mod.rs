//! Cache Module
//!
//! Provides the in-memory, size-bounded cache engine with LRU eviction.

mod entry;
mod lru;
mod release;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use release::{Release, RemovalCause};
pub use stats::CacheStats;
pub use store::SizeBoundedLruCache;
