// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-window message channel.
//!
//! One process-wide [`MessageChannel`] carries every message posted by an
//! authorization popup. A flow that is waiting on a popup registers a
//! [`WindowListener`] for that window only; the listener drops messages from
//! untrusted origins or other windows and parses the rest as an
//! [`AuthEnvelope`]. Dropping the listener unregisters it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::FlowError;

/// Identity of one popup window (the browser's `event.source`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    /// Allocate a fresh random window id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WindowId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for WindowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw message as posted by a window, before any filtering.
#[derive(Debug, Clone)]
pub struct WindowMessage {
    pub origin: String,
    pub source: WindowId,
    pub data: String,
}

/// Structured envelope posted by the redirect page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthEnvelope {
    AuthorizationComplete,
    AuthorizationFailed { reason: String },
}

/// Parse a message payload into an envelope.
///
/// Anything that is not a JSON object with a known `type` is a protocol
/// error, never a silent drop.
pub fn parse_envelope(data: &str) -> Result<AuthEnvelope, FlowError> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| FlowError::protocol(format!("unparseable window message: {e}")))?;
    let Some(kind) = value.get("type").and_then(|t| t.as_str()) else {
        return Err(FlowError::protocol("window message has no string `type`"));
    };
    let kind = kind.to_owned();
    serde_json::from_value(value)
        .map_err(|e| FlowError::protocol(format!("unrecognized window message `{kind}`: {e}")))
}

/// Compare two origins, ignoring a trailing slash.
pub fn origin_matches(trusted: &str, origin: &str) -> bool {
    !origin.is_empty() && trusted.trim_end_matches('/') == origin.trim_end_matches('/')
}

/// Process-wide message channel filtered by a single trusted origin.
pub struct MessageChannel {
    tx: broadcast::Sender<WindowMessage>,
    trusted_origin: String,
}

impl MessageChannel {
    pub fn new(trusted_origin: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, trusted_origin: trusted_origin.into() }
    }

    pub fn trusted_origin(&self) -> &str {
        &self.trusted_origin
    }

    /// Deliver a message to every registered listener. Returns how many
    /// listeners were registered at the time.
    pub fn post(&self, message: WindowMessage) -> usize {
        if !origin_matches(&self.trusted_origin, &message.origin) {
            tracing::debug!(origin = %message.origin, window = %message.source, "window message from untrusted origin");
        }
        self.tx.send(message).unwrap_or(0)
    }

    /// Register a listener for messages from `window`.
    pub fn listen(&self, window: WindowId) -> WindowListener {
        WindowListener {
            rx: self.tx.subscribe(),
            window,
            trusted_origin: self.trusted_origin.clone(),
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Subscription scoped to one popup window.
pub struct WindowListener {
    rx: broadcast::Receiver<WindowMessage>,
    window: WindowId,
    trusted_origin: String,
}

impl WindowListener {
    pub fn window(&self) -> &WindowId {
        &self.window
    }

    /// Wait for the next message addressed to this window from the trusted
    /// origin. Returns `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<Result<AuthEnvelope, FlowError>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => {
                    if !origin_matches(&self.trusted_origin, &msg.origin) {
                        continue;
                    }
                    if msg.source != self.window {
                        continue;
                    }
                    return Some(parse_envelope(&msg.data));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(window = %self.window, skipped = n, "window listener lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
