// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns authentication outcomes into user-facing notifications.

use std::sync::Arc;

use crate::authorize::AuthOutcome;
use crate::notification::{Notification, NotificationKind, NotificationQueue};

/// Id prefix shared by every authentication-failure notification.
pub const AUTH_FAILED_PREFIX: &str = "connector-auth-failed-";

/// Notification id for a connector's failure family.
pub fn failure_id(connector_id: &str) -> String {
    format!("{AUTH_FAILED_PREFIX}{connector_id}")
}

/// The notification for `outcome`, if it warrants one. Only provider
/// errors and timeouts do.
pub fn notification_for(
    connector_name: &str,
    connector_id: &str,
    outcome: &AuthOutcome,
) -> Option<Notification> {
    let message = match outcome {
        AuthOutcome::Authentified | AuthOutcome::Canceled => return None,
        AuthOutcome::Timeout => format!("Authentication to {connector_name} failed (timeout)"),
        AuthOutcome::Error(_) => format!("Authentication to {connector_name} failed"),
    };
    Some(Notification::new(failure_id(connector_id), message, NotificationKind::Negative))
}

pub struct NotificationBridge {
    queue: Arc<NotificationQueue>,
}

impl NotificationBridge {
    pub fn new(queue: Arc<NotificationQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Arc<NotificationQueue> {
        &self.queue
    }

    /// Push the notification for `outcome`, if any.
    pub fn report(&self, connector_name: &str, connector_id: &str, outcome: &AuthOutcome) {
        if let AuthOutcome::Error(reason) = outcome {
            tracing::warn!(connector = connector_id, reason = %reason, "provider rejected authorization");
        }
        if let Some(n) = notification_for(connector_name, connector_id, outcome) {
            self.queue.add_notification(n);
        }
    }

    /// Clear a connector's earlier failure notifications as a new cycle starts.
    /// Other connectors whose id extends this one (`conn-1`, `conn-10`) keep
    /// theirs.
    pub fn clear_failures(&self, connector_id: &str) -> usize {
        self.queue.remove_family(&failure_id(connector_id))
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
