//! Login flow: credential submission, second factor, post-login wiring.
//!
//! DESIGN
//! ======
//! `POST /login` is public: a wrong password is a plain request error, never
//! an unauthorized redirect. The form is a small state machine with one bit
//! of state, whether the backend asked for a second factor. On success the
//! credential is persisted (local mode only), the mounted context flips to
//! authenticated (which also tells sibling tabs) and the user lands on the
//! account page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, RequestOptions};
use crate::auth::AuthService;
use crate::context::{AuthContext, AuthState};
use crate::error::{ApiError, ErrorKind};
use crate::navigator::{ACCOUNT_ROUTE, Navigator};
use crate::state::PortalState;

pub const LOGIN_ENDPOINT: &str = "/login";
pub const TWO_FACTOR_CODE_LEN: usize = 6;

pub const EXPIRED_NOTICE: &str = "Your session has expired. Please login again.";
pub const UNAUTHORIZED_NOTICE: &str = "You are not authorized. Please login again.";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "requires2FA")]
    requires_two_factor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; a second factor must be submitted next.
    TwoFactorRequired,
    Authenticated,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("two-factor code must be {TWO_FACTOR_CODE_LEN} digits")]
    InvalidCode,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Notice shown on the login page after a forced logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginNotice {
    SessionExpired,
    Unauthorized,
}

impl LoginNotice {
    /// Read the notice from a query string (`expired=true&...`). Any
    /// non-empty value sets the flag; `expired` wins over `unauthorized`.
    #[must_use]
    pub fn from_query(query: &str) -> Option<Self> {
        let flag = |name: &str| {
            query
                .trim_start_matches('?')
                .split('&')
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .any(|(key, value)| key == name && !value.is_empty())
        };
        if flag("expired") {
            Some(Self::SessionExpired)
        } else if flag("unauthorized") {
            Some(Self::Unauthorized)
        } else {
            None
        }
    }

    /// [`LoginNotice::from_query`] on the query part of a full location.
    #[must_use]
    pub fn from_location(location: &str) -> Option<Self> {
        let query = location.split_once('?')?.1;
        Self::from_query(query.split('#').next().unwrap_or(query))
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => EXPIRED_NOTICE,
            Self::Unauthorized => UNAUTHORIZED_NOTICE,
        }
    }
}

impl std::fmt::Display for LoginNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

pub struct LoginForm {
    api: Arc<ApiClient>,
    auth: Arc<AuthService>,
    navigator: Arc<dyn Navigator>,
    requires_two_factor: bool,
}

impl LoginForm {
    #[must_use]
    pub fn new(state: &PortalState) -> Self {
        Self {
            api: Arc::clone(&state.api),
            auth: Arc::clone(&state.auth),
            navigator: Arc::clone(&state.navigator),
            requires_two_factor: false,
        }
    }

    #[must_use]
    pub fn requires_two_factor(&self) -> bool {
        self.requires_two_factor
    }

    /// Entering the login page at `location`: a forced-logout notice takes
    /// precedence; otherwise an already settled session goes straight to the
    /// account page.
    pub fn open(&self, location: &str, state: AuthState) -> Option<LoginNotice> {
        let notice = LoginNotice::from_location(location);
        if notice.is_none() && state.is_authenticated && !state.is_loading {
            self.navigator.navigate(ACCOUNT_ROUTE);
        }
        notice
    }

    /// Submit the form. `code` is only sent, and then required, once the
    /// backend has asked for a second factor.
    ///
    /// # Errors
    ///
    /// - [`LoginError::InvalidCode`]: second factor missing or not 6 digits;
    ///   nothing was sent
    /// - [`LoginError::Api`]: the backend rejected the attempt
    pub async fn submit(
        &mut self,
        credentials: &Credentials,
        code: Option<&str>,
        context: &AuthContext,
    ) -> Result<LoginOutcome, LoginError> {
        let token = if self.requires_two_factor {
            let code = code.map(str::trim).filter(|c| is_valid_code(c)).ok_or(LoginError::InvalidCode)?;
            Some(code)
        } else {
            None
        };

        let request = LoginRequest { email: &credentials.email, password: &credentials.password, token };
        let response: LoginResponse = match self.api.post(LOGIN_ENDPOINT, &request, RequestOptions::public()).await {
            Ok(response) => response,
            Err(e) => {
                if !is_second_factor_rejection(&e) {
                    self.requires_two_factor = false;
                }
                tracing::info!(kind = %e.kind(), "login rejected");
                return Err(e.into());
            }
        };

        if response.requires_two_factor {
            tracing::info!("login requires second factor");
            self.requires_two_factor = true;
            return Ok(LoginOutcome::TwoFactorRequired);
        }

        if let Some(token) = response.token.as_deref() {
            self.auth.save_token(token);
        }
        self.requires_two_factor = false;
        context.set_authenticated(true);
        self.navigator.navigate(ACCOUNT_ROUTE);
        tracing::info!(mode = ?self.auth.mode(), "login succeeded");
        Ok(LoginOutcome::Authenticated)
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("requires_two_factor", &self.requires_two_factor)
            .finish_non_exhaustive()
    }
}

/// A rejected second factor, as opposed to rejected credentials. The backend
/// signals this only through the message text, so it is matched here and
/// nowhere else.
fn is_second_factor_rejection(err: &ApiError) -> bool {
    err.kind() == ErrorKind::Request && err.message().contains("2FA")
}

fn is_valid_code(code: &str) -> bool {
    code.len() == TWO_FACTOR_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
