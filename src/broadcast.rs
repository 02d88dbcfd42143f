//! Cross-tab message bus.
//!
//! DESIGN
//! ======
//! One [`BroadcastHub`] stands for the origin; every tab opens its own
//! [`BroadcastChannel`] on a named topic. Semantics follow the browser
//! `BroadcastChannel`: messages are JSON, fan out to every other channel on
//! the same topic, and are never delivered back to the sender.
//!
//! TRADE-OFFS
//! ==========
//! Delivery is best-effort. A receiver that falls behind the hub capacity
//! skips the missed messages; the auth state is a single boolean, so the next
//! message converges it again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Topic used for authentication state.
pub const AUTH_TOPIC: &str = "auth";

const DEFAULT_CAPACITY: usize = 64;

/// Message exchanged on [`AUTH_TOPIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthMessage {
    #[serde(rename = "AUTH_STATE_CHANGED", rename_all = "camelCase")]
    AuthStateChanged {
        is_authenticated: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_loading: Option<bool>,
    },
}

#[derive(Debug, Clone)]
struct Envelope {
    topic: Arc<str>,
    sender: Uuid,
    payload: Arc<str>,
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("message encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Origin-wide bus shared by all channels. Clones share the bus.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<Envelope>,
    sent: Arc<AtomicU64>,
}

impl BroadcastHub {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, sent: Arc::new(AtomicU64::new(0)) }
    }

    /// Open a channel on `topic`. Only messages posted after this call are
    /// delivered to it.
    #[must_use]
    pub fn channel(&self, topic: &str) -> BroadcastChannel {
        BroadcastChannel {
            sender: BroadcastSender {
                id: Uuid::new_v4(),
                topic: Arc::from(topic),
                tx: self.tx.clone(),
                sent: Arc::clone(&self.sent),
            },
            rx: self.tx.subscribe(),
        }
    }

    /// Total messages posted on any topic since the hub was created.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Posting half of a channel. Shares the channel id, so messages posted
/// through it are still never echoed back to the owning channel.
#[derive(Debug, Clone)]
pub struct BroadcastSender {
    id: Uuid,
    topic: Arc<str>,
    tx: broadcast::Sender<Envelope>,
    sent: Arc<AtomicU64>,
}

impl BroadcastSender {
    /// Post `message` to every other channel on this topic.
    ///
    /// # Errors
    ///
    /// Returns an error if `message` cannot be encoded as JSON.
    pub fn post<T: Serialize>(&self, message: &T) -> Result<(), BroadcastError> {
        let payload = serde_json::to_string(message)?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(topic = %self.topic, channel = %self.id, %payload, "broadcast post");
        // Fails only when no channel is open, i.e. nobody to deliver to.
        let _ = self.tx.send(Envelope { topic: Arc::clone(&self.topic), sender: self.id, payload: Arc::from(payload) });
        Ok(())
    }
}

/// One tab's endpoint on a topic.
#[derive(Debug)]
pub struct BroadcastChannel {
    sender: BroadcastSender,
    rx: broadcast::Receiver<Envelope>,
}

impl BroadcastChannel {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.sender.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.sender.topic
    }

    #[must_use]
    pub fn sender(&self) -> BroadcastSender {
        self.sender.clone()
    }

    /// See [`BroadcastSender::post`].
    ///
    /// # Errors
    ///
    /// Returns an error if `message` cannot be encoded as JSON.
    pub fn post<T: Serialize>(&self, message: &T) -> Result<(), BroadcastError> {
        self.sender.post(message)
    }

    /// Wait for the next message from another channel on this topic.
    /// Undecodable payloads and messages for other topics are skipped.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Option<T> {
        loop {
            let envelope = match self.rx.recv().await {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.sender.topic, skipped, "broadcast receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };
            if envelope.sender == self.sender.id || envelope.topic != self.sender.topic {
                continue;
            }
            match serde_json::from_str(&envelope.payload) {
                Ok(message) => return Some(message),
                Err(e) => {
                    tracing::debug!(topic = %self.sender.topic, error = %e, "ignoring unrecognized broadcast message");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
