//! Browser-location seam: where the user is and where they get sent.

use std::sync::{Arc, Mutex, PoisonError};

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const ACCOUNT_ROUTE: &str = "/account";
pub const MAINTENANCE_ROUTE: &str = "/maintenance";
pub const LOGIN_EXPIRED_ROUTE: &str = "/login?expired=true";
pub const LOGIN_UNAUTHORIZED_ROUTE: &str = "/login?unauthorized=true";

pub trait Navigator: Send + Sync {
    /// Current path without query string.
    fn current_path(&self) -> String;

    /// Full navigation to `location` (path plus optional query).
    fn navigate(&self, location: &str);
}

/// Strip the query string and fragment from a location.
#[must_use]
pub fn path_of(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or(location)
}

/// In-memory navigator that records every navigation. Clones share history.
#[derive(Debug, Clone)]
pub struct MemoryNavigator {
    inner: Arc<Mutex<History>>,
}

#[derive(Debug)]
struct History {
    current: String,
    visited: Vec<String>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(start: &str) -> Self {
        Self { inner: Arc::new(Mutex::new(History { current: start.to_owned(), visited: Vec::new() })) }
    }

    /// Full location (with query) of the last navigation, or the start path.
    #[must_use]
    pub fn location(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Every navigation performed, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visited
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(HOME_ROUTE)
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        let history = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        path_of(&history.current).to_owned()
    }

    fn navigate(&self, location: &str) {
        tracing::info!(%location, "navigate");
        let mut history = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        history.current = location.to_owned();
        history.visited.push(location.to_owned());
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
