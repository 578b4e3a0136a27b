//! Budget Monitor Task
//!
//! Background task that periodically re-reads the memory budget and
//! shrinks the live cache in place when the ceiling has dropped.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Release;
use crate::controller::CacheController;

/// Spawns a task that calls [`CacheController::shrink_to_budget`] every
/// `interval_ms` milliseconds.
///
/// The task never creates an engine; between a `clear` and the next
/// `get_instance` it simply idles. It runs until the returned handle is
/// aborted.
///
/// # Example
/// ```ignore
/// let handle = spawn_budget_monitor(controller.clone(), config.monitor_interval_ms);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_budget_monitor<V>(controller: CacheController<V>, interval_ms: u64) -> JoinHandle<()>
where
    V: Release + Send + 'static,
{
    let interval = Duration::from_millis(interval_ms.max(1));

    tokio::spawn(async move {
        info!(interval_ms, "Starting memory budget monitor");

        loop {
            tokio::time::sleep(interval).await;

            match controller.shrink_to_budget() {
                Ok(Some(evicted)) => {
                    info!(evicted, "Budget monitor: cache shrunk to new budget");
                }
                Ok(None) => {
                    debug!("Budget monitor: no change");
                }
                Err(err) => {
                    warn!(error = %err, "Budget monitor: could not read memory budget");
                }
            }
        }
    })
}
