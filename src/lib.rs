//! Image Cache - A memory-bounded LRU cache for decoded images
//!
//! Holds decoded image resources under a process-wide memory budget,
//! evicting least recently used entries and releasing each resource
//! exactly once when it leaves.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::{Release, RemovalCause, SizeBoundedLruCache};
pub use config::Config;
pub use controller::{CacheController, HostSignal, HostSignals, SharedCache};
pub use error::{CacheError, Result};
pub use models::DecodedImage;
pub use tasks::spawn_budget_monitor;
