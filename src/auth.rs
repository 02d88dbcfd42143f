//! Auth service: credential storage, expiry checks, server probe and logout.
//!
//! ARCHITECTURE
//! ============
//! Two deployment modes, fixed at construction from [`ClientConfig`]:
//! - `LocalCredential`: the login response token is kept in [`Storage`] and
//!   sent as a bearer header. Validity is "present and not expired".
//! - `CookieSession`: the backend sets an httpOnly cookie the client cannot
//!   read. Token operations are no-ops and validity needs a probe request.
//!
//! A service built without storage (no browser-like environment) turns
//! every storage operation into a no-op.

use std::sync::Arc;

use crate::config::{AuthMode, ClientConfig};
use crate::navigator::{LOGIN_ROUTE, Navigator};
use crate::storage::Storage;
use crate::token;

pub const TOKEN_KEY: &str = "token";
pub const LOGOUT_ENDPOINT: &str = "/logout";

pub struct AuthService {
    mode: AuthMode,
    storage: Option<Arc<dyn Storage>>,
    http: reqwest::Client,
    logout_url: String,
    probe_url: String,
    navigator: Arc<dyn Navigator>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: &ClientConfig,
        http: reqwest::Client,
        storage: Option<Arc<dyn Storage>>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            mode: config.auth_mode,
            storage,
            http,
            logout_url: config.url(LOGOUT_ENDPOINT),
            probe_url: config.url(&config.probe_endpoint),
            navigator,
        }
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    fn local_storage(&self) -> Option<&dyn Storage> {
        match self.mode {
            AuthMode::LocalCredential => self.storage.as_deref(),
            AuthMode::CookieSession => None,
        }
    }

    /// Persist `token`. No-op in cookie-session mode, where the backend
    /// already set the session cookie.
    pub fn save_token(&self, token: &str) {
        let Some(storage) = self.local_storage() else {
            return;
        };
        if let Err(e) = storage.set_item(TOKEN_KEY, token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
    }

    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.local_storage()?.get_item(TOKEN_KEY)
    }

    pub fn remove_token(&self) {
        let Some(storage) = self.local_storage() else {
            return;
        };
        if let Err(e) = storage.remove_item(TOKEN_KEY) {
            tracing::warn!(error = %e, "failed to remove token");
        }
    }

    /// Synchronous check. Always `false` in cookie-session mode; use
    /// [`AuthService::check_auth_async`] there.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self.mode {
            AuthMode::LocalCredential => self.get_token().is_some_and(|t| !token::is_expired(&t)),
            AuthMode::CookieSession => false,
        }
    }

    /// Advisory expiry check on the stored token. Absent or malformed tokens
    /// are expired. In cookie-session mode there is no client token to
    /// inspect and the backend owns expiry, so this is `false`.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        match self.mode {
            AuthMode::LocalCredential => self.get_token().is_none_or(|t| token::is_expired(&t)),
            AuthMode::CookieSession => false,
        }
    }

    /// Server-verified check. Never fails: transport errors read as
    /// "not authenticated".
    pub async fn check_auth_async(&self) -> bool {
        if self.mode == AuthMode::LocalCredential {
            return self.is_authenticated();
        }

        match self.http.get(&self.probe_url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                tracing::debug!(status = resp.status().as_u16(), authenticated = ok, "auth probe");
                ok
            }
            Err(e) => {
                tracing::warn!(error = %e, "auth probe failed");
                false
            }
        }
    }

    /// Revoke the server session (best effort), clear the local credential
    /// and navigate to `redirect_to`. The last two happen even if the
    /// revoke call fails.
    pub async fn logout(&self, redirect_to: &str) {
        match self.http.post(&self.logout_url).send().await {
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(status = resp.status().as_u16(), "logout rejected by server");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "logout request failed"),
        }
        self.remove_token();
        self.navigator.navigate(redirect_to);
    }

    /// [`AuthService::logout`] to the login route.
    pub async fn logout_to_login(&self) {
        self.logout(LOGIN_ROUTE).await;
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("mode", &self.mode)
            .field("has_storage", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
