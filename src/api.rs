//! API client: the single chokepoint for backend calls.
//!
//! ARCHITECTURE
//! ============
//! Every call goes through [`ApiClient::request`]:
//! 1. join base URL and endpoint, build JSON headers plus caller headers
//! 2. non-public + local-credential: refuse locally on an expired token,
//!    otherwise attach `Authorization: Bearer <token>`
//! 3. send with the shared cookie jar
//! 4. parse the body (non-JSON is wrapped as `{ "message": <text> }`)
//! 5. classify: success, maintenance (503), unauthorized (401), other
//!
//! Maintenance and unauthorized responses trigger global side effects
//! (redirect, credential removal, unauthorized fan-out) here so individual
//! pages never reimplement them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::AuthService;
use crate::config::{AuthMode, ClientConfig};
use crate::error::{ApiError, ErrorKind};
use crate::navigator::{
    HOME_ROUTE, LOGIN_EXPIRED_ROUTE, LOGIN_ROUTE, LOGIN_UNAUTHORIZED_ROUTE, MAINTENANCE_ROUTE, Navigator,
};
use crate::notify::UnauthorizedNotifier;
use crate::token;

/// Backend response envelope convention. The client never unwraps it;
/// callers ask for `ApiResponse<T>` when they want the typed `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    pub data: T,
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Skip credential attachment and the 401 side effects.
    pub public: bool,
    /// Extra headers; these override the default `Content-Type`.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn public() -> Self {
        Self { public: true, headers: Vec::new() }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

/// Build the HTTP client shared by the API client and the auth service so
/// both see the same session cookies.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeouts.request_secs))
        .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
        .build()
}

pub struct ApiClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    auth: Arc<AuthService>,
    notifier: UnauthorizedNotifier,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        config: Arc<ClientConfig>,
        http: reqwest::Client,
        auth: Arc<AuthService>,
        notifier: UnauthorizedNotifier,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { config, http, auth, notifier, navigator }
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        self.config.url(endpoint)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None, options).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<B, T>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(Method::POST, endpoint, Some(body), options).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<B, T>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(Method::PUT, endpoint, Some(body), options).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None, options).await
    }

    /// Issue one request. Exactly one of `Ok` / `Err` per call.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Expired`]: stored token expired; no request was sent
    /// - [`ErrorKind::Maintenance`]: 503 with the maintenance flag
    /// - [`ErrorKind::Unauthorized`]: 401 on a non-public call
    /// - [`ErrorKind::Request`]: any other non-2xx
    /// - [`ErrorKind::Transport`]: the request could not be sent or read
    /// - [`ErrorKind::Decode`]: a 2xx body did not match `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.config.url(endpoint);
        let mut headers = build_headers(&options)?;

        if !options.public && self.auth.mode() == AuthMode::LocalCredential {
            // Read once: a concurrent logout between check and attach must
            // not produce a half-authenticated request.
            if let Some(token) = self.auth.get_token() {
                if token::is_expired(&token) {
                    tracing::info!(%endpoint, "stored token expired; refusing request");
                    self.auth.remove_token();
                    self.navigator.navigate(LOGIN_EXPIRED_ROUTE);
                    return Err(ApiError::expired());
                }
                let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ApiError::new(ErrorKind::Transport, None, format!("invalid token header: {e}")))?;
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        tracing::debug!(%method, %endpoint, public = options.public, "api request");
        let mut builder = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(|e| ApiError::transport(&e))?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);
        let text = response.text().await.map_err(|e| ApiError::transport(&e))?;
        let body = parse_body(&text, is_json);

        match classify(status, &body, options.public) {
            Outcome::Success => serde_json::from_value(body).map_err(|e| ApiError::decode(status, &e)),
            Outcome::Maintenance(message) => {
                tracing::warn!(%endpoint, "backend in maintenance");
                if self.navigator.current_path() != MAINTENANCE_ROUTE {
                    self.navigator.navigate(MAINTENANCE_ROUTE);
                }
                Err(ApiError::maintenance(message))
            }
            Outcome::Unauthorized(message) => {
                tracing::warn!(%endpoint, "backend rejected credentials");
                self.auth.remove_token();
                self.notifier.notify_unauthorized();
                let current = self.navigator.current_path();
                if current != LOGIN_ROUTE && current != HOME_ROUTE {
                    self.navigator.navigate(LOGIN_UNAUTHORIZED_ROUTE);
                }
                Err(ApiError::unauthorized(message))
            }
            Outcome::Failed(message) => {
                tracing::debug!(%endpoint, status, "api request failed");
                Err(ApiError::request(status, message))
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|e| ApiError::new(ErrorKind::Decode, None, format!("request body encode failed: {e}")))
}

fn build_headers(options: &RequestOptions) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::new(ErrorKind::Transport, None, format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::new(ErrorKind::Transport, None, format!("invalid header value: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}

/// JSON when declared and parsable, otherwise the raw text as `{ message }`.
pub(crate) fn parse_body(text: &str, is_json: bool) -> Value {
    if is_json {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return value;
        }
    }
    json!({ "message": text })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Maintenance(Option<String>),
    Unauthorized(Option<String>),
    Failed(Option<String>),
}

pub(crate) fn classify(status: u16, body: &Value, public: bool) -> Outcome {
    if (200..300).contains(&status) {
        return Outcome::Success;
    }
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_owned);

    if status == 503 && body.pointer("/data/maintenance").and_then(Value::as_bool) == Some(true) {
        let detail = body
            .pointer("/data/message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);
        return Outcome::Maintenance(detail.or(message));
    }
    if status == 401 && !public {
        return Outcome::Unauthorized(message);
    }
    Outcome::Failed(message)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
