//! Memory Budget Module
//!
//! Sources that report the process memory ceiling, and the policy that
//! turns a ceiling into a cache capacity.

use std::sync::Arc;

use crate::config::{Config, DEFAULT_DIVISOR, DEFAULT_UNIT_BYTES};
use crate::error::{CacheError, Result};

// == Memory Budget Source ==
/// Reports the current memory ceiling for the process, in bytes.
///
/// The controller queries this once per engine generation while holding
/// its creation lock, so implementations must not call back into the
/// controller.
pub trait MemoryBudgetSource: Send + Sync {
    fn max_memory(&self) -> Result<u64>;
}

impl<T: MemoryBudgetSource + ?Sized> MemoryBudgetSource for Arc<T> {
    fn max_memory(&self) -> Result<u64> {
        (**self).max_memory()
    }
}

/// A ceiling that never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBudget(pub u64);

impl FixedBudget {
    /// Uses `IMAGE_CACHE_MAX_MEMORY` if the configuration carries one.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.max_memory.map(FixedBudget)
    }
}

impl MemoryBudgetSource for FixedBudget {
    fn max_memory(&self) -> Result<u64> {
        Ok(self.0)
    }
}

/// A budget source backed by a closure, for hosts that measure memory
/// their own way.
pub struct FnBudget<F>(pub F);

impl<F> MemoryBudgetSource for FnBudget<F>
where
    F: Fn() -> Result<u64> + Send + Sync,
{
    fn max_memory(&self) -> Result<u64> {
        (self.0)()
    }
}

// == Capacity Policy ==
/// Converts a memory ceiling into a capacity:
/// `ceiling / unit_bytes / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    divisor: u64,
    unit_bytes: u64,
}

impl CapacityPolicy {
    /// Fails with `InvalidArgument` if either value is zero.
    pub fn new(divisor: u64, unit_bytes: u64) -> Result<Self> {
        if divisor == 0 {
            return Err(CacheError::InvalidArgument(
                "capacity divisor must be non-zero".to_string(),
            ));
        }
        if unit_bytes == 0 {
            return Err(CacheError::InvalidArgument(
                "accounting unit must be at least one byte".to_string(),
            ));
        }
        Ok(Self {
            divisor,
            unit_bytes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.divisor, config.unit_bytes)
    }

    /// Capacity in accounting units for a ceiling in bytes.
    pub fn capacity_for(&self, budget_bytes: u64) -> u64 {
        budget_bytes / self.unit_bytes / self.divisor
    }

    /// Weight of a `bytes`-sized resource, rounded up to whole units.
    pub fn size_of(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.unit_bytes)
    }

    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    pub fn unit_bytes(&self) -> u64 {
        self.unit_bytes
    }
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_DIVISOR,
            unit_bytes: DEFAULT_UNIT_BYTES,
        }
    }
}
