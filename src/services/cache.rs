//! Single-flight cache for slow-changing public resources.
//!
//! DESIGN
//! ======
//! The slot is guarded by an async mutex held across the fetch, so the
//! first caller fetches and concurrent callers wait for its result instead
//! of issuing their own request. Failures are not cached: the next waiter
//! (or caller) fetches again.
//!
//! TRADE-OFFS
//! ==========
//! A waiter behind a failed fetch retries rather than sharing the failure.
//! That costs at most one extra request per waiter on an already failing
//! backend and keeps the slot a plain `Option`.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::ApiError;

#[derive(Debug)]
pub struct CachedResource<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for CachedResource<T> {
    fn default() -> Self {
        Self { slot: Mutex::new(None) }
    }
}

impl<T> CachedResource<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, or the result of `fetch` (cached on success).
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns; nothing is cached in that case.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<T>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(fetch().await?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Current value without fetching.
    pub async fn cached(&self) -> Option<Arc<T>> {
        self.slot.lock().await.clone()
    }

    /// Drop the cached value. Waits for an in-flight fetch to finish first.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
