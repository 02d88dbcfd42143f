//! Shared client state, wired once at the composition root.
//!
//! DESIGN
//! ======
//! `PortalState` owns one HTTP client (one cookie jar), the auth service,
//! the API client and the unauthorized notifier. Clone is cheap: every
//! field is Arc-wrapped or already shares its inner state. Auth contexts
//! are mounted from it per tab, against a [`BroadcastHub`] that stands for
//! the origin.

use std::sync::Arc;

use crate::api::{ApiClient, build_http_client};
use crate::auth::AuthService;
use crate::broadcast::{AUTH_TOPIC, BroadcastHub};
use crate::config::ClientConfig;
use crate::context::AuthContext;
use crate::navigator::Navigator;
use crate::notify::UnauthorizedNotifier;
use crate::storage::Storage;

#[derive(Clone)]
pub struct PortalState {
    pub config: Arc<ClientConfig>,
    pub auth: Arc<AuthService>,
    pub api: Arc<ApiClient>,
    pub notifier: UnauthorizedNotifier,
    pub navigator: Arc<dyn Navigator>,
}

impl PortalState {
    /// Wire the client. `storage` is `None` outside a browser-like
    /// environment; token operations then become no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        storage: Option<Arc<dyn Storage>>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let http = build_http_client(&config)?;
        let notifier = UnauthorizedNotifier::new();
        let auth = Arc::new(AuthService::new(&config, http.clone(), storage, Arc::clone(&navigator)));
        let api = Arc::new(ApiClient::new(
            Arc::clone(&config),
            http,
            Arc::clone(&auth),
            notifier.clone(),
            Arc::clone(&navigator),
        ));
        tracing::debug!(api_url = %config.api_url, mode = ?config.auth_mode, "portal client ready");
        Ok(Self { config, auth, api, notifier, navigator })
    }

    /// Mount an auth context for one tab on `hub`. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn mount_context(&self, hub: &BroadcastHub) -> AuthContext {
        AuthContext::mount(Arc::clone(&self.auth), &self.notifier, hub.channel(AUTH_TOPIC))
    }
}

impl std::fmt::Debug for PortalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalState")
            .field("config", &self.config)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
