//! Configuration Module
//!
//! Handles loading cache sizing configuration from environment variables.

use std::env;

/// Default fraction of the process memory ceiling given to the cache (1/8).
pub const DEFAULT_DIVISOR: u64 = 8;

/// Default accounting unit in bytes (sizes and capacity are in KiB).
pub const DEFAULT_UNIT_BYTES: u64 = 1024;

/// Default budget monitor period in milliseconds.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 5000;

/// Cache sizing configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity is the memory ceiling divided by this value
    pub divisor: u64,
    /// Size of one accounting unit in bytes
    pub unit_bytes: u64,
    /// Fixed process memory ceiling in bytes, if the host does not supply one
    pub max_memory: Option<u64>,
    /// Budget monitor period in milliseconds
    pub monitor_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `IMAGE_CACHE_DIVISOR` - Budget divisor (default: 8)
    /// - `IMAGE_CACHE_UNIT_BYTES` - Accounting unit in bytes (default: 1024)
    /// - `IMAGE_CACHE_MAX_MEMORY` - Fixed memory ceiling in bytes (default: unset)
    /// - `IMAGE_CACHE_MONITOR_INTERVAL_MS` - Monitor period (default: 5000)
    pub fn from_env() -> Self {
        Self {
            divisor: env::var("IMAGE_CACHE_DIVISOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DIVISOR),
            unit_bytes: env::var("IMAGE_CACHE_UNIT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_UNIT_BYTES),
            max_memory: env::var("IMAGE_CACHE_MAX_MEMORY")
                .ok()
                .and_then(|v| v.parse().ok()),
            monitor_interval_ms: env::var("IMAGE_CACHE_MONITOR_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MONITOR_INTERVAL_MS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_DIVISOR,
            unit_bytes: DEFAULT_UNIT_BYTES,
            max_memory: None,
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}
