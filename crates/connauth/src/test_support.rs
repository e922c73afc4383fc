// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::authorize::Authorizer;
use crate::channel::{MessageChannel, WindowId, WindowMessage};
use crate::connector::{AuthorizationEndpoint, AuthorizationRequest};
use crate::popup::{PopupOpener, PopupWindow};

pub const TRUSTED_ORIGIN: &str = "https://editor.example.com";

/// A popup the fake opener handed out.
#[derive(Clone)]
pub struct OpenedPopup {
    pub window: WindowId,
    pub connector: String,
    pub url: String,
    closed: Arc<AtomicBool>,
}

impl OpenedPopup {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Opener that records every popup and never touches a real window.
#[derive(Default)]
pub struct FakeOpener {
    opened: Mutex<Vec<OpenedPopup>>,
    fail: bool,
}

impl FakeOpener {
    pub fn failing() -> Self {
        Self { opened: Mutex::new(vec![]), fail: true }
    }

    pub fn opened(&self) -> Vec<OpenedPopup> {
        self.opened.lock().clone()
    }

    /// Wait until at least `n` popups have been opened and return the last.
    pub async fn wait_for_popup(&self, n: usize) -> anyhow::Result<OpenedPopup> {
        for _ in 0..1000 {
            {
                let opened = self.opened.lock();
                if opened.len() >= n {
                    if let Some(last) = opened.last() {
                        return Ok(last.clone());
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        anyhow::bail!("popup #{n} never opened")
    }
}

impl PopupOpener for FakeOpener {
    fn open(
        &self,
        window: &WindowId,
        connector: &str,
        url: &str,
    ) -> anyhow::Result<Box<dyn PopupWindow>> {
        if self.fail {
            anyhow::bail!("popup blocked");
        }
        let closed = Arc::new(AtomicBool::new(false));
        self.opened.lock().push(OpenedPopup {
            window: window.clone(),
            connector: connector.to_owned(),
            url: url.to_owned(),
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(FakeWindow { id: window.clone(), closed }))
    }
}

struct FakeWindow {
    id: WindowId,
    closed: Arc<AtomicBool>,
}

impl PopupWindow for FakeWindow {
    fn id(&self) -> &WindowId {
        &self.id
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Wait until every window listener on `channel` has been dropped.
pub async fn wait_for_no_listeners(channel: &MessageChannel) -> anyhow::Result<()> {
    for _ in 0..1000 {
        if channel.listener_count() == 0 {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    anyhow::bail!("{} window listener(s) still registered", channel.listener_count())
}

pub fn test_channel() -> Arc<MessageChannel> {
    Arc::new(MessageChannel::new(TRUSTED_ORIGIN, 64))
}

pub fn test_authorizer(
    channel: &Arc<MessageChannel>,
    opener: &Arc<FakeOpener>,
    timeout: Duration,
) -> Arc<Authorizer> {
    let opener: Arc<dyn PopupOpener> = Arc::clone(opener) as Arc<dyn PopupOpener>;
    Arc::new(Authorizer::new(Arc::clone(channel), opener, timeout))
}

pub fn test_request() -> AuthorizationRequest {
    AuthorizationRequest::new(
        AuthorizationEndpoint {
            client_id: "client-123".into(),
            scope: "read".into(),
            authorization_endpoint: "https://provider.example.com/authorize".into(),
        },
        "https://editor.example.com/auth/redirect",
    )
}

/// Post a message from `window` with the given origin.
pub fn post(channel: &MessageChannel, origin: &str, window: &WindowId, data: &str) {
    channel.post(WindowMessage {
        origin: origin.to_owned(),
        source: window.clone(),
        data: data.to_owned(),
    });
}

pub const COMPLETE: &str = r#"{"type":"AuthorizationComplete"}"#;
