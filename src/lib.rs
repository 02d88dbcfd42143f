//! Portal client: authentication state and API access for a game-server
//! portal backend.
//!
//! ARCHITECTURE
//! ============
//! [`PortalState`] is the composition root. It owns one HTTP client (one
//! cookie jar) shared by:
//! - [`AuthService`]: credential storage, expiry checks, probe, logout
//! - [`ApiClient`]: every backend call, with global maintenance and
//!   unauthorized handling
//! - [`UnauthorizedNotifier`]: fan-out from the API client to every mounted
//!   [`AuthContext`]
//!
//! Each tab mounts its own [`AuthContext`]; contexts on the same
//! [`BroadcastHub`] converge through one message per explicit change.

pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod context;
pub mod error;
pub mod navigator;
pub mod notify;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;
pub mod token;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiClient, ApiResponse, RequestOptions};
pub use auth::AuthService;
pub use broadcast::{AuthMessage, BroadcastChannel, BroadcastHub};
pub use config::{AuthMode, ClientConfig, ConfigError};
pub use context::{AuthContext, AuthState};
pub use error::{ApiError, ErrorKind};
pub use navigator::{MemoryNavigator, Navigator};
pub use notify::{Subscription, UnauthorizedNotifier};
pub use session::{Credentials, LoginError, LoginForm, LoginNotice, LoginOutcome};
pub use state::PortalState;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
