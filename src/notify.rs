//! Unauthorized fan-out from the API client to every mounted auth context.
//!
//! The API client holds no reference to any context. It only knows the
//! notifier, created once at the composition root and cloned into both
//! sides. Subscriptions are RAII guards: dropping one unsubscribes, so
//! repeated mount/unmount cycles never accumulate stale callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, Callback>>,
}

/// Observer registry. Clones share the same subscriber set.
#[derive(Clone, Default)]
pub struct UnauthorizedNotifier {
    registry: Arc<Registry>,
}

impl UnauthorizedNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; it receives the new authentication value (always
    /// `false` for unauthorized events).
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));
        Subscription { id, registry: Arc::downgrade(&self.registry) }
    }

    /// Tell every subscriber the session is no longer valid.
    pub fn notify_unauthorized(&self) {
        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking.
        let callbacks: Vec<Callback> = self
            .registry
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tracing::debug!(subscribers = callbacks.len(), "notify unauthorized");
        for callback in callbacks {
            callback(false);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for UnauthorizedNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Live registration; unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
