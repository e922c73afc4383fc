// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Popup lifecycle: one window per authorization attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::WindowId;
use crate::events::{EventFeed, ServiceEvent};

/// A live popup window.
pub trait PopupWindow: Send + Sync {
    fn id(&self) -> &WindowId;
    fn close(&self);
    fn is_closed(&self) -> bool;
}

/// Opens popup windows pointed at an authorization URL.
pub trait PopupOpener: Send + Sync {
    fn open(
        &self,
        window: &WindowId,
        connector: &str,
        url: &str,
    ) -> anyhow::Result<Box<dyn PopupWindow>>;
}

/// Shareable handle that can close its popup from any code path.
///
/// The handle owns the window exclusively; the first `close()` takes it out
/// and later calls do nothing.
#[derive(Clone)]
pub struct PopupHandle {
    window: WindowId,
    inner: Arc<Mutex<Option<Box<dyn PopupWindow>>>>,
}

impl PopupHandle {
    pub fn new(popup: Box<dyn PopupWindow>) -> Self {
        Self { window: popup.id().clone(), inner: Arc::new(Mutex::new(Some(popup))) }
    }

    pub fn window(&self) -> &WindowId {
        &self.window
    }

    /// Close the popup if it is still held. Returns `true` if this call
    /// released it.
    pub fn close(&self) -> bool {
        let Some(popup) = self.inner.lock().take() else {
            return false;
        };
        if !popup.is_closed() {
            popup.close();
        }
        true
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().as_ref().is_some_and(|p| !p.is_closed())
    }
}

impl std::fmt::Debug for PopupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupHandle").field("window", &self.window).finish()
    }
}

/// Opener that delegates the actual window to the UI shell through the
/// event feed.
pub struct EventPopupOpener {
    events: Arc<EventFeed>,
}

impl EventPopupOpener {
    pub fn new(events: Arc<EventFeed>) -> Self {
        Self { events }
    }
}

impl PopupOpener for EventPopupOpener {
    fn open(
        &self,
        window: &WindowId,
        connector: &str,
        url: &str,
    ) -> anyhow::Result<Box<dyn PopupWindow>> {
        self.events.publish(ServiceEvent::PopupOpened {
            connector: connector.to_owned(),
            window: window.clone(),
            url: url.to_owned(),
        });
        tracing::debug!(connector, window = %window, "popup requested");
        Ok(Box::new(EventPopup {
            id: window.clone(),
            connector: connector.to_owned(),
            closed: AtomicBool::new(false),
            events: Arc::clone(&self.events),
        }))
    }
}

struct EventPopup {
    id: WindowId,
    connector: String,
    closed: AtomicBool,
    events: Arc<EventFeed>,
}

impl PopupWindow for EventPopup {
    fn id(&self) -> &WindowId {
        &self.id
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.events.publish(ServiceEvent::PopupClosed {
            connector: self.connector.clone(),
            window: self.id.clone(),
        });
        tracing::debug!(connector = %self.connector, window = %self.id, "popup closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "popup_tests.rs"]
mod tests;
