//! Client configuration parsed from environment variables.
//!
//! The credential mode is resolved here, once, and never re-evaluated per
//! call. When `PORTAL_AUTH_MODE` is unset the mode is inferred from the API
//! host: a loopback backend runs on a different port than the pages, so
//! cookies cannot be shared and a local bearer token is used instead.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_PROBE_ENDPOINT: &str = "/account";
pub const DEFAULT_TOKEN_FILE: &str = ".portal/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown PORTAL_AUTH_MODE: {0} (expected 'local' or 'cookie')")]
    UnknownAuthMode(String),
    #[error("invalid PORTAL_API_URL: {0}")]
    InvalidApiUrl(String),
}

/// Where the session credential lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Bearer token kept in client storage and attached to each request.
    LocalCredential,
    /// httpOnly session cookie managed by the backend; the client never sees it.
    CookieSession,
}

impl AuthMode {
    /// Parse an explicit mode name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAuthMode`] for anything but `local` / `cookie`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::LocalCredential),
            "cookie" => Ok(Self::CookieSession),
            other => Err(ConfigError::UnknownAuthMode(other.to_owned())),
        }
    }

    /// Infer the mode from the API base URL host.
    #[must_use]
    pub fn infer(api_url: &str) -> Self {
        match reqwest::Url::parse(api_url).ok().and_then(|u| u.host_str().map(str::to_owned)) {
            Some(host) if host == "localhost" || host == "127.0.0.1" => Self::LocalCredential,
            _ => Self::CookieSession,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth_mode: AuthMode,
    pub probe_endpoint: String,
    pub token_file: PathBuf,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Config for the given base URL with every other value defaulted.
    #[must_use]
    pub fn new(api_url: &str, auth_mode: AuthMode) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            auth_mode,
            probe_endpoint: DEFAULT_PROBE_ENDPOINT.to_owned(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            timeouts: Timeouts::default(),
        }
    }

    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_API_URL`: default `http://localhost:8080/api`
    /// - `PORTAL_AUTH_MODE`: `local` or `cookie`; inferred from the API host when absent
    /// - `PORTAL_PROBE_ENDPOINT`: default `/account`
    /// - `PORTAL_TOKEN_FILE`: default `.portal/session.json`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown auth mode or an unparsable API URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown auth mode or an unparsable API URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("PORTAL_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();
        reqwest::Url::parse(&api_url).map_err(|e| ConfigError::InvalidApiUrl(format!("{api_url}: {e}")))?;

        let auth_mode = match lookup("PORTAL_AUTH_MODE").filter(|v| !v.trim().is_empty()) {
            Some(raw) => AuthMode::parse(&raw)?,
            None => AuthMode::infer(&api_url),
        };

        let probe_endpoint = lookup("PORTAL_PROBE_ENDPOINT").unwrap_or_else(|| DEFAULT_PROBE_ENDPOINT.to_owned());
        let token_file = lookup("PORTAL_TOKEN_FILE").map_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);
        let timeouts = Timeouts {
            request_secs: parse_u64(&lookup, "PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_url, auth_mode, probe_endpoint, token_file, timeouts })
    }

    /// Join the base URL with an endpoint path.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.api_url)
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
