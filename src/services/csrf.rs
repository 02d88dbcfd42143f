//! CSRF token for state-changing requests.
//!
//! DESIGN
//! ======
//! The token is fetched from `/csrf-token` with the session credentials and
//! kept in session-scoped storage, never in the long-lived credential store.
//! The fetch uses the raw HTTP client: a failure here must not trigger the
//! API client's redirects, it only means "no token".

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use crate::api::RequestOptions;
use crate::auth::AuthService;
use crate::config::ClientConfig;
use crate::storage::Storage;

pub const CSRF_ENDPOINT: &str = "/csrf-token";
pub const CSRF_STORAGE_KEY: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfResponse {
    csrf_token: String,
}

pub struct CsrfService {
    url: String,
    http: reqwest::Client,
    auth: Arc<AuthService>,
    session: Arc<dyn Storage>,
}

impl CsrfService {
    #[must_use]
    pub fn new(config: &ClientConfig, http: reqwest::Client, auth: Arc<AuthService>, session: Arc<dyn Storage>) -> Self {
        Self { url: config.url(CSRF_ENDPOINT), http, auth, session }
    }

    /// Fetch a fresh token and store it. Failures are logged and read as
    /// "no token".
    pub async fn fetch(&self) -> Option<String> {
        let mut request = self.http.get(&self.url);
        if let Some(token) = self.auth.get_token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "csrf token request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "csrf token rejected");
            return None;
        }
        let token = match response.json::<CsrfResponse>().await {
            Ok(body) => body.csrf_token,
            Err(e) => {
                tracing::warn!(error = %e, "csrf token response malformed");
                return None;
            }
        };

        if let Err(e) = self.session.set_item(CSRF_STORAGE_KEY, &token) {
            tracing::warn!(error = %e, "failed to store csrf token");
        }
        Some(token)
    }

    #[must_use]
    pub fn stored(&self) -> Option<String> {
        self.session.get_item(CSRF_STORAGE_KEY)
    }

    pub fn clear(&self) {
        if let Err(e) = self.session.remove_item(CSRF_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to clear csrf token");
        }
    }

    /// Stored token, or a freshly fetched one.
    pub async fn get_or_fetch(&self) -> Option<String> {
        match self.stored() {
            Some(token) => Some(token),
            None => self.fetch().await,
        }
    }

    /// `options` plus the CSRF header when a token is available.
    pub async fn protect(&self, options: RequestOptions) -> RequestOptions {
        match self.get_or_fetch().await {
            Some(token) => options.header(CSRF_HEADER, &token),
            None => options,
        }
    }
}

impl std::fmt::Debug for CsrfService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfService").field("url", &self.url).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "csrf_test.rs"]
mod tests;
