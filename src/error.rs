//! Uniform error shape for every call that goes through the API client.
//!
//! DESIGN
//! ======
//! Pages never inspect message text. They branch on [`ErrorKind`] or on the
//! numeric status (e.g. 404 → not-found view). Transport failures carry no
//! status; everything the backend answered carries the HTTP status.

use std::fmt;

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stored credential expired before the request was sent.
    Expired,
    /// The backend answered 503 with the maintenance flag set.
    Maintenance,
    /// The backend answered 401 on a non-public request.
    Unauthorized,
    /// Any other non-2xx response.
    Request,
    /// The request could not be sent or the response body could not be read.
    Transport,
    /// A request body could not be encoded, or a 2xx body did not match
    /// the expected shape.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Expired => "expired",
            Self::Maintenance => "maintenance",
            Self::Unauthorized => "unauthorized",
            Self::Request => "request",
            Self::Transport => "transport",
            Self::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Error returned by every API client call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
}

pub const EXPIRED_MESSAGE: &str = "Session expired. Please login again.";
pub const MAINTENANCE_MESSAGE: &str = "Server is under maintenance";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Please login again.";
pub const GENERIC_MESSAGE: &str = "Request failed";

impl ApiError {
    #[must_use]
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self { kind, status, message: message.into() }
    }

    #[must_use]
    pub fn expired() -> Self {
        Self::new(ErrorKind::Expired, None, EXPIRED_MESSAGE)
    }

    #[must_use]
    pub fn maintenance(message: Option<String>) -> Self {
        Self::new(ErrorKind::Maintenance, Some(503), message.unwrap_or_else(|| MAINTENANCE_MESSAGE.to_owned()))
    }

    #[must_use]
    pub fn unauthorized(message: Option<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, Some(401), message.unwrap_or_else(|| UNAUTHORIZED_MESSAGE.to_owned()))
    }

    #[must_use]
    pub fn request(status: u16, message: Option<String>) -> Self {
        Self::new(ErrorKind::Request, Some(status), message.unwrap_or_else(|| GENERIC_MESSAGE.to_owned()))
    }

    #[must_use]
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::new(ErrorKind::Transport, None, err.to_string())
    }

    #[must_use]
    pub fn decode(status: u16, err: &serde_json::Error) -> Self {
        Self::new(ErrorKind::Decode, Some(status), format!("unexpected response body: {err}"))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status, when the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
