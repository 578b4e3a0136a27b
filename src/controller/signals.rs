//! Host Signals Module
//!
//! A subscription hub the host uses to broadcast low-memory and shutdown
//! notifications without the cache depending on the host's mechanism.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

/// Notification raised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSignal {
    LowMemory,
    Shutdown,
}

/// Handle returned by [`HostSignals::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(HostSignal) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

/// Subscription hub for host notifications.
///
/// Handlers run on the thread that calls [`notify`](Self::notify), with
/// the hub unlocked, so a handler may subscribe or unsubscribe (itself
/// included) while it runs.
#[derive(Default)]
pub struct HostSignals {
    subscribers: Mutex<Subscribers>,
}

impl HostSignals {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for every future notification.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(HostSignal) + Send + Sync + 'static,
    {
        let mut subscribers = self.lock();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.handlers.len();
        subscribers.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != subscribers.handlers.len()
    }

    /// Delivers `signal` to every handler registered at the time of the
    /// call. Returns how many handlers ran.
    pub fn notify(&self, signal: HostSignal) -> usize {
        let handlers: Vec<Handler> = self
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        debug!(?signal, subscribers = handlers.len(), "Dispatching host signal");
        for handler in &handlers {
            handler(signal);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }
}

impl std::fmt::Debug for HostSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSignals")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
