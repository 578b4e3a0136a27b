//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and
//! size-bounded eviction.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, LruTracker, Release, RemovalCause};
use crate::error::{CacheError, Result};
use crate::models::EntryInfo;

/// Internal cache state, guarded by a single mutex.
struct CacheState<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Performance statistics
    stats: CacheStats,
    /// Exact sum of resident entry sizes
    current_size: u64,
    /// Ceiling on `current_size`
    capacity: u64,
    disposed: bool,
}

impl<K, V> CacheState<K, V>
where
    K: Eq + Hash + Clone,
    V: Release,
{
    fn new(capacity: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(capacity),
            current_size: 0,
            capacity,
            disposed: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Removes `key` and adjusts accounting. The value is queued on
    /// `pending` for release.
    fn remove_entry(&mut self, key: &K, cause: RemovalCause, pending: &mut Pending<V>) -> Option<u64> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.current_size -= entry.size;
        self.stats.record_removal(cause);
        let size = entry.size;
        pending.push((entry.into_value(), cause));
        Some(size)
    }

    /// Evicts least recently used entries until `current_size <= target`,
    /// queueing them on `pending`.
    ///
    /// Returns the number of entries removed.
    fn trim_to(&mut self, target: u64, cause: RemovalCause, pending: &mut Pending<V>) -> usize {
        let mut removed = 0;
        while self.current_size > target {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.current_size -= entry.size;
                self.stats.record_removal(cause);
                debug!(size = entry.size, ?cause, "Evicted least recently used entry");
                pending.push((entry.into_value(), cause));
                removed += 1;
            }
        }
        removed
    }

    /// Empties the cache, zero-sized entries included, and queues every
    /// value on `pending`.
    fn clear_all(&mut self, pending: &mut Pending<V>) -> usize {
        let entries = std::mem::take(&mut self.entries);
        self.lru.clear();
        self.current_size = 0;

        let count = entries.len();
        pending.extend(
            entries
                .into_values()
                .map(|entry| (entry.into_value(), RemovalCause::Cleared)),
        );
        count
    }
}

/// Values taken out of the cache by one operation, in removal order.
type Pending<V> = Vec<(V, RemovalCause)>;

/// Runs the release hooks for `pending`, in order.
///
/// Called once the state is consistent, so a panicking hook cannot leave
/// the accounting out of step with the resident entries.
fn release_all<V: Release>(pending: Pending<V>) {
    for (value, cause) in pending {
        value.release(cause);
    }
}

// == Size Bounded LRU Cache ==
/// Thread-safe cache bounded by the sum of its entries' declared sizes.
///
/// When a `put` pushes the total above capacity, entries are evicted
/// strictly from least to most recently used until the total fits again
/// or the cache is empty. Every value is handed to [`Release::release`]
/// exactly once when it leaves.
///
/// After [`dispose`](Self::dispose), lookups and mutations fail with
/// [`CacheError::Disposed`]; introspection (`len`, `current_size`, `stats`)
/// keeps working and reports an empty cache.
///
/// # Example
///
/// ```
/// use image_cache::cache::SizeBoundedLruCache;
///
/// let cache: SizeBoundedLruCache<String, Vec<u8>> = SizeBoundedLruCache::new(8);
/// cache.put("a".to_string(), vec![1, 2, 3], 3).unwrap();
/// cache.put("b".to_string(), vec![4, 5, 6], 6).unwrap();
///
/// // "a" was least recently used and had to go to fit "b"
/// assert!(cache.get("a").unwrap().is_none());
/// assert_eq!(cache.current_size(), 6);
/// ```
pub struct SizeBoundedLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Release,
{
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> SizeBoundedLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Release,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` units.
    ///
    /// A capacity of 0 is valid: every put with a non-zero size is evicted
    /// immediately.
    pub fn new(capacity: u64) -> Self {
        Self {
            state: Mutex::new(CacheState::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V>> {
        // Every mutation settles the accounting before any release hook
        // runs, so a hook that panicked left the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns a clone of the value for `key` and marks it most recently used.
    ///
    /// A miss has no side effect besides the miss counter. Never evicts.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut state = self.lock();
        state.ensure_live()?;

        let found = state
            .entries
            .get_key_value(key)
            .map(|(k, entry)| (k.clone(), entry.value.clone()));

        match found {
            Some((owned_key, value)) => {
                state.lru.touch(&owned_key);
                state.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Peek ==
    /// Like [`get`](Self::get) but leaves recency and counters untouched.
    pub fn peek<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let state = self.lock();
        state.ensure_live()?;
        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    /// Returns true if `key` is resident. Does not affect recency.
    pub fn contains<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let state = self.lock();
        state.ensure_live()?;
        Ok(state.entries.contains_key(key))
    }

    // == Put ==
    /// Stores `value` under `key` with a declared `size`, taking ownership.
    ///
    /// A resident entry with the same key is released with
    /// [`RemovalCause::Replaced`] and its size is returned. The total is
    /// then brought back under capacity by LRU eviction; an entry larger
    /// than the capacity ends up evicted along with everything older.
    ///
    /// Fails with `InvalidArgument` without touching the cache if the new
    /// total would overflow `u64`.
    pub fn put(&self, key: K, value: V, size: u64) -> Result<Option<u64>> {
        let mut state = self.lock();
        state.ensure_live()?;

        let old_size = state.entries.get(&key).map_or(0, |entry| entry.size);
        let base = state.current_size - old_size;
        if base.checked_add(size).is_none() {
            warn!(size, "Refusing put: size overflows the running total");
            return Err(CacheError::InvalidArgument(format!(
                "size {} overflows the running total of {}",
                size, base
            )));
        }

        let displaced = state.entries.insert(key.clone(), CacheEntry::new(value, size));
        state.current_size = base + size;
        state.lru.touch(&key);
        state.stats.record_put();

        let mut pending = Vec::new();
        let displaced_size = displaced.map(|entry| {
            state.stats.record_removal(RemovalCause::Replaced);
            debug!(old_size = entry.size, new_size = size, "Replaced cache entry");
            let old = entry.size;
            pending.push((entry.into_value(), RemovalCause::Replaced));
            old
        });

        let capacity = state.capacity;
        state.trim_to(capacity, RemovalCause::Evicted, &mut pending);

        release_all(pending);
        Ok(displaced_size)
    }

    // == Evict ==
    /// Removes `key` if resident, releasing its value.
    ///
    /// Returns true if an entry was removed; an absent key is a no-op.
    pub fn evict<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.lock();
        state.ensure_live()?;

        let owned_key = match state.entries.get_key_value(key) {
            Some((k, _)) => k.clone(),
            None => return Ok(false),
        };
        let mut pending = Vec::new();
        let removed = state
            .remove_entry(&owned_key, RemovalCause::Explicit, &mut pending)
            .is_some();
        release_all(pending);
        Ok(removed)
    }

    // == Evict All ==
    /// Releases every entry with [`RemovalCause::Cleared`] and resets the
    /// total to 0. Safe on an empty cache.
    pub fn evict_all(&self) -> Result<usize> {
        let mut state = self.lock();
        state.ensure_live()?;

        let mut pending = Vec::new();
        let cleared = state.clear_all(&mut pending);
        release_all(pending);
        Ok(cleared)
    }

    // == Trim To Size ==
    /// Evicts least recently used entries until the total is at most
    /// `target`. Returns the number of entries evicted.
    pub fn trim_to_size(&self, target: u64) -> Result<usize> {
        let mut state = self.lock();
        state.ensure_live()?;

        let mut pending = Vec::new();
        let evicted = state.trim_to(target, RemovalCause::Evicted, &mut pending);
        release_all(pending);
        Ok(evicted)
    }

    // == Resize ==
    /// Changes the capacity in place, evicting down to it if needed.
    pub fn resize(&self, capacity: u64) -> Result<usize> {
        let mut state = self.lock();
        state.ensure_live()?;

        state.capacity = capacity;
        state.stats.capacity = capacity;

        let mut pending = Vec::new();
        let evicted = state.trim_to(capacity, RemovalCause::Evicted, &mut pending);
        release_all(pending);
        Ok(evicted)
    }

    // == Dispose ==
    /// Releases every entry and drops internal storage.
    ///
    /// Idempotent: later calls are no-ops.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }

        let mut pending = Vec::new();
        let released = state.clear_all(&mut pending);
        state.lru = LruTracker::new();
        state.disposed = true;
        debug!(released, "Disposed cache");
        release_all(pending);
    }

    /// Resident entries from least to most recently used.
    pub fn snapshot(&self) -> Result<Vec<EntryInfo<K>>> {
        let state = self.lock();
        state.ensure_live()?;

        Ok(state
            .lru
            .iter()
            .filter_map(|key| {
                state.entries.get(key).map(|entry| EntryInfo {
                    key: key.clone(),
                    size: entry.size,
                    inserted_at: entry.inserted_at,
                })
            })
            .collect())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entry_count = state.entries.len();
        stats.current_size = state.current_size;
        stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Exact sum of resident entry sizes.
    pub fn current_size(&self) -> u64 {
        self.lock().current_size
    }

    pub fn capacity(&self) -> u64 {
        self.lock().capacity
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl<K, V> Drop for SizeBoundedLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Release,
{
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.disposed {
            let mut pending = Vec::new();
            state.clear_all(&mut pending);
            release_all(pending);
        }
    }
}

impl<K, V> std::fmt::Debug for SizeBoundedLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Release,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SizeBoundedLruCache")
            .field("entries", &state.entries.len())
            .field("current_size", &state.current_size)
            .field("capacity", &state.capacity)
            .field("disposed", &state.disposed)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;

    /// Value that records every release it receives.
    #[derive(Debug, Clone)]
    struct Tracked {
        id: &'static str,
        log: Arc<StdMutex<Vec<(&'static str, RemovalCause)>>>,
    }

    impl Release for Tracked {
        fn release(self, cause: RemovalCause) {
            self.log.lock().unwrap().push((self.id, cause));
        }
    }

    struct Harness {
        cache: SizeBoundedLruCache<String, Tracked>,
        log: Arc<StdMutex<Vec<(&'static str, RemovalCause)>>>,
    }

    impl Harness {
        fn new(capacity: u64) -> Self {
            Self {
                cache: SizeBoundedLruCache::new(capacity),
                log: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn value(&self, id: &'static str) -> Tracked {
            Tracked {
                id,
                log: self.log.clone(),
            }
        }

        fn put(&self, id: &'static str, size: u64) -> Option<u64> {
            self.cache.put(id.to_string(), self.value(id), size).unwrap()
        }

        fn released(&self) -> Vec<(&'static str, RemovalCause)> {
            self.log.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_store_new() {
        let cache: SizeBoundedLruCache<String, Vec<u8>> = SizeBoundedLruCache::new(100);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 100);
        assert_eq!(cache.current_size(), 0);
    }

    #[test]
    fn test_store_put_and_get() {
        let cache = SizeBoundedLruCache::new(100);

        cache.put("key1".to_string(), vec![1u8, 2, 3], 3).unwrap();

        assert_eq!(cache.get("key1").unwrap(), Some(vec![1u8, 2, 3]));
        assert_eq!(cache.current_size(), 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let cache: SizeBoundedLruCache<String, Vec<u8>> = SizeBoundedLruCache::new(100);
        assert_eq!(cache.get("missing").unwrap(), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let h = Harness::new(3);
        for id in ["a", "b", "c", "d", "e"] {
            h.put(id, 1);
        }

        assert_eq!(
            h.released(),
            vec![("a", RemovalCause::Evicted), ("b", RemovalCause::Evicted)]
        );
        assert_eq!(h.cache.current_size(), 3);
        assert_eq!(h.cache.stats().evictions, 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let h = Harness::new(2);
        h.put("a", 1);
        h.put("b", 1);
        // Room for two: "a" is touched then "c" arrives
        assert!(h.cache.get("a").unwrap().is_some());
        h.put("c", 1);

        assert_eq!(h.released(), vec![("b", RemovalCause::Evicted)]);
        assert!(h.cache.contains("a").unwrap());
        assert!(h.cache.contains("c").unwrap());
    }

    #[test]
    fn test_get_refreshes_recency_after_overflow() {
        let h = Harness::new(2);
        h.put("a", 1);
        h.put("b", 1);
        h.cache.get("a").unwrap();
        h.put("c", 1);
        h.put("d", 1);

        // "b" goes first, then "a" (touched before "c" and "d" arrived)
        assert_eq!(
            h.released(),
            vec![("b", RemovalCause::Evicted), ("a", RemovalCause::Evicted)]
        );
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let h = Harness::new(2);
        h.put("a", 1);
        h.put("b", 1);
        assert!(h.cache.peek("a").unwrap().is_some());
        h.put("c", 1);

        assert_eq!(h.released(), vec![("a", RemovalCause::Evicted)]);
        assert_eq!(h.cache.stats().hits, 0);
    }

    #[test]
    fn test_replacement_accounting() {
        let h = Harness::new(100);
        h.put("other", 10);
        assert_eq!(h.put("k", 5), None);
        assert_eq!(h.cache.current_size(), 15);

        assert_eq!(h.put("k", 3), Some(5));

        assert_eq!(h.cache.current_size(), 13);
        assert_eq!(h.cache.len(), 2);
        assert_eq!(h.released(), vec![("k", RemovalCause::Replaced)]);
        assert_eq!(h.cache.stats().replacements, 1);
    }

    #[test]
    fn test_replacement_refreshes_recency() {
        let h = Harness::new(2);
        h.put("a", 1);
        h.put("b", 1);
        h.put("a", 1);
        h.put("c", 1);

        assert_eq!(
            h.released(),
            vec![("a", RemovalCause::Replaced), ("b", RemovalCause::Evicted)]
        );
    }

    #[test]
    fn test_oversized_entry_on_empty_cache() {
        let h = Harness::new(10);
        h.put("huge", 11);

        assert!(h.cache.is_empty());
        assert_eq!(h.cache.current_size(), 0);
        assert_eq!(h.released(), vec![("huge", RemovalCause::Evicted)]);
    }

    #[test]
    fn test_oversized_entry_evicts_older_entries_first() {
        let h = Harness::new(10);
        h.put("a", 4);
        h.put("b", 4);
        h.put("huge", 11);

        assert!(h.cache.is_empty());
        assert_eq!(
            h.released(),
            vec![
                ("a", RemovalCause::Evicted),
                ("b", RemovalCause::Evicted),
                ("huge", RemovalCause::Evicted),
            ]
        );
    }

    #[test]
    fn test_entry_exactly_at_capacity_stays() {
        let h = Harness::new(10);
        h.put("fits", 10);

        assert_eq!(h.cache.current_size(), 10);
        assert!(h.released().is_empty());
    }

    #[test]
    fn test_zero_capacity_cache() {
        let h = Harness::new(0);
        h.put("a", 1);
        h.put("b", 7);

        assert!(h.cache.is_empty());
        assert_eq!(h.cache.current_size(), 0);
        assert_eq!(h.released().len(), 2);
    }

    #[test]
    fn test_zero_size_entries_are_kept() {
        let h = Harness::new(0);
        h.put("free", 0);

        assert_eq!(h.cache.len(), 1);
        assert_eq!(h.cache.current_size(), 0);
    }

    #[test]
    fn test_put_overflow_is_rejected_without_mutation() {
        let h = Harness::new(u64::MAX);
        h.put("a", u64::MAX - 1);

        let result = h.cache.put("b".to_string(), h.value("b"), 2);

        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert_eq!(h.cache.current_size(), u64::MAX - 1);
        assert_eq!(h.cache.len(), 1);
        // Value passed to the failed put was dropped, not released
        assert!(h.released().is_empty());
    }

    #[test]
    fn test_evict_specific_key() {
        let h = Harness::new(10);
        h.put("a", 3);
        h.put("b", 4);

        assert!(h.cache.evict("a").unwrap());
        assert!(!h.cache.evict("a").unwrap());
        assert!(!h.cache.evict("nonexistent").unwrap());

        assert_eq!(h.cache.current_size(), 4);
        assert_eq!(h.released(), vec![("a", RemovalCause::Explicit)]);
        assert_eq!(h.cache.stats().removals, 1);
    }

    #[test]
    fn test_evict_all_is_idempotent() {
        let h = Harness::new(10);
        h.put("a", 3);
        h.put("b", 4);
        h.put("c", 0);

        assert_eq!(h.cache.evict_all().unwrap(), 3);
        assert_eq!(h.cache.evict_all().unwrap(), 0);

        assert!(h.cache.is_empty());
        assert_eq!(h.cache.current_size(), 0);
        let mut released = h.released();
        released.sort();
        assert_eq!(
            released,
            vec![
                ("a", RemovalCause::Cleared),
                ("b", RemovalCause::Cleared),
                ("c", RemovalCause::Cleared),
            ]
        );
    }

    #[test]
    fn test_trim_to_size() {
        let h = Harness::new(10);
        h.put("a", 3);
        h.put("b", 3);
        h.put("c", 3);

        assert_eq!(h.cache.trim_to_size(4).unwrap(), 2);
        assert_eq!(h.cache.current_size(), 3);
        assert!(h.cache.contains("c").unwrap());
        // Already under target
        assert_eq!(h.cache.trim_to_size(4).unwrap(), 0);
        // Capacity is unchanged
        assert_eq!(h.cache.capacity(), 10);
    }

    #[test]
    fn test_resize_shrinks_and_trims() {
        let h = Harness::new(10);
        h.put("a", 4);
        h.put("b", 4);

        assert_eq!(h.cache.resize(5).unwrap(), 1);
        assert_eq!(h.cache.capacity(), 5);
        assert_eq!(h.cache.stats().capacity, 5);
        assert_eq!(h.released(), vec![("a", RemovalCause::Evicted)]);

        h.put("c", 1);
        assert_eq!(h.cache.current_size(), 5);
    }

    #[test]
    fn test_snapshot_in_lru_order() {
        let h = Harness::new(10);
        h.put("a", 1);
        h.put("b", 2);
        h.put("c", 3);
        h.cache.get("a").unwrap();

        let snapshot = h.cache.snapshot().unwrap();
        let keys: Vec<&str> = snapshot.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        assert_eq!(snapshot[1].size, 3);
    }

    #[test]
    fn test_dispose_releases_and_rejects() {
        let h = Harness::new(10);
        h.put("a", 3);

        h.cache.dispose();
        h.cache.dispose();

        assert!(h.cache.is_disposed());
        assert_eq!(h.released(), vec![("a", RemovalCause::Cleared)]);
        assert_eq!(h.cache.len(), 0);
        assert_eq!(h.cache.current_size(), 0);

        assert_eq!(h.cache.get("a").unwrap_err(), CacheError::Disposed);
        assert_eq!(
            h.cache.put("b".to_string(), h.value("b"), 1).unwrap_err(),
            CacheError::Disposed
        );
        assert_eq!(h.cache.evict("a").unwrap_err(), CacheError::Disposed);
        assert_eq!(h.cache.evict_all().unwrap_err(), CacheError::Disposed);
        assert_eq!(h.cache.trim_to_size(0).unwrap_err(), CacheError::Disposed);
        assert_eq!(h.cache.resize(1).unwrap_err(), CacheError::Disposed);
        assert_eq!(h.cache.snapshot().unwrap_err(), CacheError::Disposed);
        assert_eq!(h.released().len(), 1);
    }

    #[test]
    fn test_stats_snapshot() {
        let h = Harness::new(10);
        h.put("a", 4);
        h.cache.get("a").unwrap();
        h.cache.get("missing").unwrap();

        let stats = h.cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.current_size, 4);
        assert_eq!(stats.capacity, 10);
    }

    #[test]
    fn test_drop_releases_resident_entries() {
        let h = Harness::new(10);
        h.put("a", 3);
        h.put("b", 3);
        let log = h.log.clone();

        drop(h.cache);

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    /// Value whose release hook panics when `fails` is set.
    struct Brittle {
        fails: bool,
        releases: Arc<AtomicUsize>,
    }

    impl Release for Brittle {
        fn release(self, _cause: RemovalCause) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                panic!("release hook failed");
            }
        }
    }

    fn brittle(fails: bool, releases: &Arc<AtomicUsize>) -> Brittle {
        Brittle {
            fails,
            releases: releases.clone(),
        }
    }

    #[test]
    fn test_panicking_release_during_evict_all_keeps_accounting() {
        let releases = Arc::new(AtomicUsize::new(0));
        let cache = SizeBoundedLruCache::new(10);
        for key in ["a", "b", "c", "d", "e"] {
            cache.put(key.to_string(), brittle(true, &releases), 2).unwrap();
        }

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| cache.evict_all()));
        assert!(result.is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.current_size(), 0);

        // The emptied cache has its full capacity back
        cache.put("fresh".to_string(), brittle(false, &releases), 5).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.current_size(), 5);
        assert!(cache.contains("fresh").unwrap());
    }

    #[test]
    fn test_panicking_release_during_replacement_finishes_trim() {
        let releases = Arc::new(AtomicUsize::new(0));
        let cache = SizeBoundedLruCache::new(10);
        cache.put("k".to_string(), brittle(true, &releases), 4).unwrap();
        cache.put("a".to_string(), brittle(false, &releases), 4).unwrap();

        // "k" grows to 8, so "a" must be evicted before the old "k" hook runs
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            cache.put("k".to_string(), brittle(false, &releases), 8)
        }));
        assert!(result.is_err());

        assert_eq!(cache.current_size(), 8);
        assert!(cache.current_size() <= cache.capacity());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("k").unwrap());
        assert!(!cache.contains("a").unwrap());
    }

    #[derive(Clone)]
    struct Counted(Arc<AtomicUsize>);

    impl Release for Counted {
        fn release(self, _cause: RemovalCause) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_concurrent_puts_release_every_value_once() {
        let cache = Arc::new(SizeBoundedLruCache::new(50));
        let releases = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                let releases = releases.clone();
                thread::spawn(move || {
                    for i in 0..250u64 {
                        let key = format!("{}-{}", t, i % 40);
                        cache.put(key.clone(), Counted(releases.clone()), i % 5).unwrap();
                        cache.get(&key).unwrap();
                        if i % 7 == 0 {
                            cache.evict(&key).unwrap();
                        }
                        assert!(cache.current_size() <= 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        cache.dispose();
        assert_eq!(releases.load(Ordering::SeqCst), 1000);
    }
}
