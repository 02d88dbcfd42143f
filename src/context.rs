//! Auth context: per-tab reactive authentication state.
//!
//! STATE MACHINE
//! =============
//! `Loading → {Authenticated, Unauthenticated}`, no terminal state.
//! Writers:
//! - `check_auth` (also run once on mount): settles the state, clears loading
//! - `set_authenticated`: immediate, posts one cross-tab message
//! - inbound cross-tab message: adopted as-is, never re-posted
//! - unauthorized notification: `set_authenticated(false)`
//!
//! ORDERING
//! ========
//! Every write bumps a generation counter. A `check_auth` that resolves after
//! a newer write discards its result, so the observed value is always the
//! most recent authoritative one. Loading clears when the last in-flight
//! check or logout finishes; each holds a guard so a cancelled one still
//! releases its count.
//!
//! Dropping the context unmounts it: the channel listener and the mount-time
//! check are aborted and the notifier subscription is released, so nothing
//! writes to an unmounted context.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::AuthService;
use crate::broadcast::{AuthMessage, BroadcastChannel, BroadcastSender};
use crate::navigator::LOGIN_ROUTE;
use crate::notify::{Subscription, UnauthorizedNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl AuthState {
    pub const LOADING: Self = Self { is_authenticated: false, is_loading: true };
}

struct Inner {
    auth: Arc<AuthService>,
    state: watch::Sender<AuthState>,
    channel: BroadcastSender,
    generation: AtomicU64,
    pending_checks: AtomicUsize,
}

impl Inner {
    /// Count one more operation in flight and raise loading. The returned
    /// guard lowers the count on completion or when its future is dropped.
    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.pending_checks.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| s.is_loading = true);
        LoadingGuard { inner: self, finished: false }
    }

    fn end_loading(&self, authenticated: Option<bool>) {
        let remaining = self.pending_checks.fetch_sub(1, Ordering::SeqCst) - 1;
        self.state.send_modify(|s| {
            if let Some(value) = authenticated {
                s.is_authenticated = value;
            }
            if remaining == 0 {
                s.is_loading = false;
            }
        });
    }

    async fn check_auth(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pending = self.begin_loading();

        let authenticated = self.auth.check_auth_async().await;

        let latest = self.generation.load(Ordering::SeqCst) == generation;
        if !latest {
            tracing::debug!(generation, "discarding stale auth check");
        }
        pending.finish(latest.then_some(authenticated));
    }

    fn set_authenticated(&self, value: bool) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| s.is_authenticated = value);
        let message = AuthMessage::AuthStateChanged { is_authenticated: value, is_loading: None };
        if let Err(e) = self.channel.post(&message) {
            tracing::warn!(error = %e, "failed to broadcast auth state");
        }
    }

    fn adopt(&self, message: AuthMessage) {
        let AuthMessage::AuthStateChanged { is_authenticated, is_loading } = message;
        tracing::debug!(is_authenticated, ?is_loading, "adopting cross-tab auth state");
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.is_authenticated = is_authenticated;
            if let Some(loading) = is_loading {
                s.is_loading = loading;
            }
        });
    }
}

/// One in-flight loading operation. Dropping it unfinished (a cancelled
/// check) releases the count without touching `is_authenticated`.
struct LoadingGuard<'a> {
    inner: &'a Inner,
    finished: bool,
}

impl LoadingGuard<'_> {
    fn finish(mut self, authenticated: Option<bool>) {
        self.finished = true;
        self.inner.end_loading(authenticated);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("auth check cancelled");
            self.inner.end_loading(None);
        }
    }
}

pub struct AuthContext {
    inner: Arc<Inner>,
    _subscription: Subscription,
    listener: JoinHandle<()>,
    initial_check: JoinHandle<()>,
}

impl AuthContext {
    /// Mount a context: start in `Loading`, listen on `channel`, subscribe to
    /// `notifier` and kick off the initial check. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn mount(auth: Arc<AuthService>, notifier: &UnauthorizedNotifier, mut channel: BroadcastChannel) -> Self {
        let (state, _) = watch::channel(AuthState::LOADING);
        let inner = Arc::new(Inner {
            auth,
            state,
            channel: channel.sender(),
            generation: AtomicU64::new(0),
            pending_checks: AtomicUsize::new(0),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = notifier.subscribe(move |value| {
            if let Some(inner) = weak.upgrade() {
                inner.set_authenticated(value);
            }
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let listener = tokio::spawn(async move {
            while let Some(message) = channel.recv::<AuthMessage>().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.adopt(message);
            }
        });

        let weak = Arc::downgrade(&inner);
        let initial_check = tokio::spawn(async move {
            if let Some(inner) = weak.upgrade() {
                inner.check_auth().await;
            }
        });

        Self { inner, _subscription: subscription, listener, initial_check }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    /// Reactive view of the state for consumers that re-render on change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Wait until no check is in flight and return the settled state.
    pub async fn settled(&self) -> AuthState {
        let mut rx = self.watch();
        let Ok(state) = rx.wait_for(|s| !s.is_loading).await else {
            return self.state();
        };
        *state
    }

    /// Re-run the authentication check. Failures settle to unauthenticated.
    pub async fn check_auth(&self) {
        self.inner.check_auth().await;
    }

    /// Set the state locally and announce it to other tabs.
    pub fn set_authenticated(&self, value: bool) {
        self.inner.set_authenticated(value);
    }

    /// Mark unauthenticated everywhere, then revoke the session and go to the
    /// login route.
    pub async fn logout(&self) {
        let pending = self.inner.begin_loading();
        self.inner.set_authenticated(false);
        self.inner.auth.logout(LOGIN_ROUTE).await;
        pending.finish(None);
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.listener.abort();
        self.initial_check.abort();
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").field("state", &self.state()).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
