//! Controller Module
//!
//! Lifecycle of the process-wide image cache: budget sources, capacity
//! policy, host signal subscriptions and the controller itself.

mod budget;
#[allow(clippy::module_inception)]
mod controller;
mod signals;

pub use budget::{CapacityPolicy, FixedBudget, FnBudget, MemoryBudgetSource};
pub use controller::{CacheController, SharedCache};
pub use signals::{HostSignal, HostSignals, SubscriptionId};
