//! Cache Controller
//!
//! Owns the lifecycle of the shared cache: lazy creation sized from the
//! memory budget, and a single teardown entry point wired to host signals.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::{Release, SizeBoundedLruCache};
use crate::config::Config;
use crate::controller::{CapacityPolicy, HostSignals, MemoryBudgetSource, SubscriptionId};
use crate::error::Result;
use crate::models::{CacheSnapshot, GenerationInfo};

/// Handle to the live cache. Keys are content hashes or source URIs.
pub type SharedCache<V> = Arc<SizeBoundedLruCache<String, V>>;

/// One engine together with the bookkeeping needed to tear it down.
struct Generation<V: Release> {
    cache: SharedCache<V>,
    info: GenerationInfo,
    subscription: SubscriptionId,
}

struct Slot<V: Release> {
    live: Option<Generation<V>>,
    created: u64,
}

struct ControllerInner<V: Release> {
    budget: Arc<dyn MemoryBudgetSource>,
    policy: CapacityPolicy,
    signals: Arc<HostSignals>,
    slot: Mutex<Slot<V>>,
}

impl<V: Release> ControllerInner<V> {
    fn lock_slot(&self) -> MutexGuard<'_, Slot<V>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown(&self, generation: Generation<V>) {
        // A handle holder may already have disposed the engine
        let released = generation.cache.evict_all().unwrap_or(0);
        generation.cache.dispose();
        self.signals.unsubscribe(generation.subscription);
        info!(
            generation = generation.info.id,
            released, "Image cache cleared"
        );
    }

    fn clear(&self) -> bool {
        let mut slot = self.lock_slot();
        match slot.live.take() {
            Some(generation) => {
                self.teardown(generation);
                true
            }
            None => false,
        }
    }

    /// Clears only if generation `id` is still the live one.
    fn clear_generation(&self, id: u64) -> bool {
        let mut slot = self.lock_slot();
        if slot.live.as_ref().map(|generation| generation.info.id) != Some(id) {
            return false;
        }
        match slot.live.take() {
            Some(generation) => {
                self.teardown(generation);
                true
            }
            None => false,
        }
    }
}

impl<V: Release> Drop for ControllerInner<V> {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(generation) = slot.live.take() {
            generation.cache.dispose();
            self.signals.unsubscribe(generation.subscription);
        }
    }
}

// == Cache Controller ==
/// Lazily creates the shared [`SizeBoundedLruCache`] and tears it down.
///
/// At most one engine is live at a time. The first
/// [`get_instance`](Self::get_instance) after construction or after
/// [`clear`](Self::clear) queries the memory budget source, sizes a new
/// engine through the [`CapacityPolicy`] and subscribes to the host
/// signals; any [`HostSignal`](crate::controller::HostSignal) clears it.
///
/// Cloning the controller yields another handle to the same slot.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use image_cache::controller::{CacheController, CapacityPolicy, FixedBudget, HostSignal, HostSignals};
///
/// let signals = Arc::new(HostSignals::new());
/// let controller: CacheController<Vec<u8>> = CacheController::new(
///     Arc::new(FixedBudget(64 * 1024 * 1024)),
///     CapacityPolicy::default(),
///     signals.clone(),
/// );
///
/// let cache = controller.get_instance().unwrap();
/// cache.put("thumb:42".to_string(), vec![0u8; 4096], 4).unwrap();
///
/// signals.notify(HostSignal::LowMemory);
/// assert!(controller.current().is_none());
/// ```
pub struct CacheController<V: Release> {
    inner: Arc<ControllerInner<V>>,
}

impl<V: Release> Clone for CacheController<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> CacheController<V>
where
    V: Release + Send + 'static,
{
    pub fn new(
        budget: Arc<dyn MemoryBudgetSource>,
        policy: CapacityPolicy,
        signals: Arc<HostSignals>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                budget,
                policy,
                signals,
                slot: Mutex::new(Slot {
                    live: None,
                    created: 0,
                }),
            }),
        }
    }

    /// Builds a controller with the policy described by `config`.
    pub fn from_config(
        config: &Config,
        budget: Arc<dyn MemoryBudgetSource>,
        signals: Arc<HostSignals>,
    ) -> Result<Self> {
        let policy = CapacityPolicy::from_config(config)?;
        Ok(Self::new(budget, policy, signals))
    }

    // == Get Instance ==
    /// Returns the live engine, creating it first if there is none.
    ///
    /// Creation happens under the controller lock, so concurrent first
    /// callers all receive the same engine. If the budget source fails,
    /// nothing is created and the error is returned.
    pub fn get_instance(&self) -> Result<SharedCache<V>> {
        let mut slot = self.inner.lock_slot();
        if let Some(generation) = &slot.live {
            return Ok(generation.cache.clone());
        }

        let budget_bytes = self.inner.budget.max_memory().inspect_err(|err| {
            warn!(error = %err, "Memory budget unavailable, cache not created");
        })?;
        let capacity = self.inner.policy.capacity_for(budget_bytes);
        let cache: SharedCache<V> = Arc::new(SizeBoundedLruCache::new(capacity));

        let id = slot.created + 1;
        let weak: Weak<ControllerInner<V>> = Arc::downgrade(&self.inner);
        let subscription = self.inner.signals.subscribe(move |signal| {
            if let Some(inner) = weak.upgrade() {
                // A handler copied out before `clear` may outlive its generation
                if inner.clear_generation(id) {
                    info!(?signal, generation = id, "Host signal cleared image cache");
                }
            }
        });

        slot.created = id;
        slot.live = Some(Generation {
            cache: cache.clone(),
            info: GenerationInfo {
                id,
                budget_bytes,
                capacity,
                created_at: Utc::now(),
            },
            subscription,
        });

        info!(generation = id, budget_bytes, capacity, "Image cache created");
        Ok(cache)
    }

    // == Clear ==
    /// Evicts every entry, disposes the engine, drops it from the slot and
    /// unsubscribes from host signals.
    ///
    /// Returns false (and does nothing) if no engine was live.
    pub fn clear(&self) -> bool {
        self.inner.clear()
    }

    /// The live engine, without creating one.
    pub fn current(&self) -> Option<SharedCache<V>> {
        self.inner
            .lock_slot()
            .live
            .as_ref()
            .map(|generation| generation.cache.clone())
    }

    /// Number of engines created so far.
    pub fn generation(&self) -> u64 {
        self.inner.lock_slot().created
    }

    pub fn generation_info(&self) -> Option<GenerationInfo> {
        self.inner
            .lock_slot()
            .live
            .as_ref()
            .map(|generation| generation.info.clone())
    }

    /// Generation, counters and LRU order of the live engine, if any.
    pub fn snapshot(&self) -> Result<Option<CacheSnapshot<String>>> {
        let slot = self.inner.lock_slot();
        let Some(generation) = &slot.live else {
            return Ok(None);
        };

        Ok(Some(CacheSnapshot {
            generation: generation.info.clone(),
            stats: generation.cache.stats(),
            entries: generation.cache.snapshot()?,
        }))
    }

    // == Shrink To Budget ==
    /// Re-queries the budget source and, if the derived capacity is below
    /// the live engine's, resizes it in place.
    ///
    /// Returns the number of entries evicted, or None if there is no live
    /// engine or the budget did not shrink. Never creates an engine.
    pub fn shrink_to_budget(&self) -> Result<Option<usize>> {
        let mut slot = self.inner.lock_slot();
        let Some(generation) = slot.live.as_mut() else {
            return Ok(None);
        };

        let budget_bytes = self.inner.budget.max_memory()?;
        let capacity = self.inner.policy.capacity_for(budget_bytes);
        if capacity >= generation.cache.capacity() {
            return Ok(None);
        }

        let evicted = generation.cache.resize(capacity)?;
        generation.info.budget_bytes = budget_bytes;
        generation.info.capacity = capacity;
        info!(
            generation = generation.info.id,
            capacity, evicted, "Memory budget shrank, cache resized"
        );
        Ok(Some(evicted))
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.inner.policy
    }

    pub fn signals(&self) -> &Arc<HostSignals> {
        &self.inner.signals
    }
}

impl<V> std::fmt::Debug for CacheController<V>
where
    V: Release,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.inner.lock_slot();
        f.debug_struct("CacheController")
            .field("policy", &self.inner.policy)
            .field("generation", &slot.created)
            .field("live", &slot.live.is_some())
            .finish()
    }
}
