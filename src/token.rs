//! Advisory decoding of JWT-like bearer tokens.
//!
//! The payload segment is decoded WITHOUT signature verification. The result
//! only spares the user a request that is certain to be rejected; the backend
//! re-validates every credential. Nothing here may gate access to data.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Deserialize;

/// The subset of claims the client looks at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: Option<f64>,
}

/// Decode the payload segment of `token`. `None` for anything that is not
/// three dot-separated segments with a base64 JSON object in the middle.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}

/// Whether `token` is expired at `now_ms` (milliseconds since the epoch).
/// Malformed tokens and tokens without an `exp` claim count as expired.
#[must_use]
pub fn is_expired_at(token: &str, now_ms: u128) -> bool {
    let Some(exp) = decode_claims(token).and_then(|c| c.exp) else {
        return true;
    };
    if !exp.is_finite() || exp <= 0.0 {
        return true;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let exp_ms = (exp * 1000.0) as u128;
    now_ms >= exp_ms
}

#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_ms())
}

pub(crate) fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
