// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service event feed.
//!
//! Everything the UI shell has to react to goes through here: popups it must
//! open or close, notifications to show or dismiss, and flow settlements.
//! Served to clients over `/ws/events`.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::channel::WindowId;
use crate::notification::NotificationView;

/// Events published by the orchestrator, popup manager and notification queue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServiceEvent {
    /// The UI shell should open `url` in a popup identified by `window`.
    PopupOpened { connector: String, window: WindowId, url: String },
    /// The popup for `window` must be closed.
    PopupClosed { connector: String, window: WindowId },
    /// An authentication flow reached a terminal state.
    FlowSettled { connector: String, outcome: String },
    /// A notification became the displayed one.
    NotificationShown { notification: NotificationView },
    /// The displayed notification left the slot. `preempted` is true when it
    /// is still pending behind a more urgent one.
    NotificationDismissed { key: u64, id: String, preempted: bool },
}

impl ServiceEvent {
    /// Connector this event concerns, if any.
    pub fn connector(&self) -> Option<&str> {
        match self {
            Self::PopupOpened { connector, .. }
            | Self::PopupClosed { connector, .. }
            | Self::FlowSettled { connector, .. } => Some(connector),
            Self::NotificationShown { .. } | Self::NotificationDismissed { .. } => None,
        }
    }
}

/// Broadcast hub for [`ServiceEvent`]s.
pub struct EventFeed {
    tx: broadcast::Sender<ServiceEvent>,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ServiceEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
