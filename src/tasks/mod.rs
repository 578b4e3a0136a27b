//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Budget Monitor: Shrinks the live cache when the memory budget drops

mod monitor;

pub use monitor::spawn_budget_monitor;
