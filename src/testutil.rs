//! Test helpers: token builders and an in-process mock backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::config::{AuthMode, ClientConfig};
use crate::navigator::MemoryNavigator;
use crate::state::PortalState;
use crate::storage::{MemoryStorage, Storage};

// =============================================================================
// TOKENS
// =============================================================================

pub fn jwt_with_payload(payload: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload);
    format!("{header}.{body}.signature")
}

pub fn jwt_with_exp(exp: i64) -> String {
    jwt_with_payload(&format!(r#"{{"sub":"1","exp":{exp}}}"#))
}

/// A token valid for the next hour.
pub fn fresh_jwt() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    jwt_with_exp(i64::try_from(now).unwrap() + 3600)
}

pub fn expired_jwt() -> String {
    jwt_with_exp(1_000_000_000)
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub content_type: Option<&'static str>,
    pub set_cookie: Option<String>,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: Some("application/json"),
            set_cookie: None,
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self { status, body: body.to_owned(), content_type: Some("text/plain"), set_cookie: None, delay: Duration::ZERO }
    }

    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.set_cookie = Some(cookie.to_owned());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Default)]
struct MockInner {
    routes: HashMap<(String, String), MockReply>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
struct MockState {
    inner: Arc<Mutex<MockInner>>,
}

/// Backend on `127.0.0.1:<ephemeral>` serving canned replies under `/api`.
/// Unknown routes answer 404 with a JSON message.
pub struct MockBackend {
    pub api_url: String,
    state: MockState,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { api_url: format!("http://{addr}/api"), state }
    }

    /// Register `reply` for `method` on `endpoint` (relative to `/api`).
    pub fn on(&self, method: &str, endpoint: &str, reply: MockReply) {
        self.state
            .inner
            .lock()
            .unwrap()
            .routes
            .insert((method.to_owned(), format!("/api{endpoint}")), reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.inner.lock().unwrap().requests.clone()
    }

    pub fn hits(&self, endpoint: &str) -> usize {
        let path = format!("/api{endpoint}");
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn last_request(&self, endpoint: &str) -> Option<RecordedRequest> {
        let path = format!("/api{endpoint}");
        self.requests().into_iter().rev().find(|r| r.path == path)
    }
}

async fn handle(State(state): State<MockState>, req: Request) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let headers = req.headers().clone();
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8_lossy(&bytes).into_owned();

    let reply = {
        let mut inner = state.inner.lock().unwrap();
        inner.requests.push(RecordedRequest { method: method.clone(), path: path.clone(), headers, body });
        inner.routes.get(&(method, path)).cloned()
    };

    let Some(reply) = reply else {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"not found"}"#))
            .unwrap();
    };

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut builder = Response::builder().status(reply.status);
    if let Some(content_type) = reply.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(cookie) = reply.set_cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }
    builder.body(Body::from(reply.body)).unwrap()
}

/// An API URL nothing listens on.
pub async fn unreachable_api_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

// =============================================================================
// PORTAL FIXTURE
// =============================================================================

pub struct Fixture {
    pub state: PortalState,
    pub storage: MemoryStorage,
    pub navigator: MemoryNavigator,
}

pub fn fixture(api_url: &str, mode: AuthMode, start_path: &str) -> Fixture {
    let storage = MemoryStorage::new();
    let navigator = MemoryNavigator::new(start_path);
    let config = ClientConfig::new(api_url, mode);
    let state = PortalState::new(
        config,
        Some(Arc::new(storage.clone()) as Arc<dyn Storage>),
        Arc::new(navigator.clone()),
    )
    .unwrap();
    Fixture { state, storage, navigator }
}
