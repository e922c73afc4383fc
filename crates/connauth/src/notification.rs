// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification priority queue.
//!
//! Notifications wait in a pending list ordered by a fixed precedence table
//! over `(kind, has_action)`. The head of the list is the single displayed
//! ("current") notification. Insertion is stable: a new notification goes in
//! front of the first strictly weaker one, behind everything of equal rank.
//!
//! Displaying is signalled through [`ServiceEvent::NotificationShown`] and
//! [`ServiceEvent::NotificationDismissed`]. When a more urgent notification
//! arrives the displayed one is dismissed early but stays pending, and comes
//! back once it is at the head again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::events::{EventFeed, ServiceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Negative,
    Positive,
    Informative,
}

/// Precedence table, most urgent first.
const PRIORITY_TABLE: [(NotificationKind, bool); 6] = [
    (NotificationKind::Negative, true),
    (NotificationKind::Negative, false),
    (NotificationKind::Positive, true),
    (NotificationKind::Informative, true),
    (NotificationKind::Positive, false),
    (NotificationKind::Informative, false),
];

/// Rank of a `(kind, has_action)` pair. Lower is more urgent.
pub fn priority_rank(kind: NotificationKind, has_action: bool) -> usize {
    PRIORITY_TABLE
        .iter()
        .position(|&(k, a)| k == kind && a == has_action)
        .unwrap_or(PRIORITY_TABLE.len())
}

/// Label plus callback offered alongside a notification.
#[derive(Clone)]
pub struct NotificationAction {
    pub label: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl NotificationAction {
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self { label: label.into(), callback: Arc::new(callback) }
    }

    pub fn invoke(&self) {
        (self.callback)();
    }
}

impl std::fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationAction").field("label", &self.label).finish()
    }
}

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// A transient user-facing message.
///
/// `id` groups logically related notifications (bulk removal by prefix);
/// `key` is the identity of this instance and is shared by its clones.
#[derive(Debug, Clone)]
pub struct Notification {
    key: u64,
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub action: Option<NotificationAction>,
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn new(id: impl Into<String>, message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            id: id.into(),
            message: message.into(),
            kind,
            action: None,
            duration: None,
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn priority(&self) -> usize {
        priority_rank(self.kind, self.action.is_some())
    }

    pub fn view(&self) -> NotificationView {
        NotificationView {
            key: self.key,
            id: self.id.clone(),
            message: self.message.clone(),
            kind: self.kind,
            action: self.action.as_ref().map(|a| a.label.clone()),
            duration_ms: self.duration.map(|d| d.as_millis() as u64),
        }
    }
}

/// Serializable snapshot of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub key: u64,
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Separates a notification family id from a per-instance suffix.
pub const FAMILY_DELIMITER: char = ':';

#[derive(Default)]
struct QueueInner {
    pending: Vec<Notification>,
    /// `(key, id)` of the notification last announced as shown.
    shown: Option<(u64, String)>,
    /// Bumped every time a notification is announced as shown.
    display_seq: u64,
}

pub struct NotificationQueue {
    inner: Mutex<QueueInner>,
    events: Arc<EventFeed>,
    this: Weak<NotificationQueue>,
}

impl NotificationQueue {
    pub fn new(events: Arc<EventFeed>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            inner: Mutex::new(QueueInner::default()),
            events,
            this: this.clone(),
        })
    }

    /// Insert a notification, preempting the current one if it is less urgent.
    pub fn add_notification(&self, notification: Notification) {
        let rank = notification.priority();
        let mut inner = self.inner.lock();

        if let Some(current) = inner.pending.first() {
            if rank < current.priority() {
                tracing::debug!(current = %current.id, incoming = %notification.id, "preempting notification");
                self.dismiss_shown(&mut inner, true);
            }
        }

        let at = inner
            .pending
            .iter()
            .position(|n| n.priority() > rank)
            .unwrap_or(inner.pending.len());
        inner.pending.insert(at, notification);
        self.promote(&mut inner);
    }

    /// Remove a notification by identity. Returns `true` if it was pending.
    pub fn remove_notification(&self, notification: &Notification) -> bool {
        self.remove_by_key(notification.key).is_some()
    }

    /// Remove a notification by key.
    pub fn remove_by_key(&self, key: u64) -> Option<Notification> {
        let mut inner = self.inner.lock();
        let at = inner.pending.iter().position(|n| n.key == key)?;
        let removed = inner.pending.remove(at);
        self.promote(&mut inner);
        Some(removed)
    }

    /// Remove every notification whose id starts with `prefix`. Returns how
    /// many were removed.
    pub fn remove_notifications(&self, prefix: &str) -> usize {
        self.remove_where(prefix, |id| id.starts_with(prefix))
    }

    /// Remove the notifications of the family `id`: the id itself and any
    /// `id:<suffix>` variant, but not ids that merely share its prefix.
    pub fn remove_family(&self, id: &str) -> usize {
        self.remove_where(id, |candidate| {
            candidate
                .strip_prefix(id)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(FAMILY_DELIMITER))
        })
    }

    fn remove_where(&self, pattern: &str, matches: impl Fn(&str) -> bool) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.pending.len();
        inner.pending.retain(|n| !matches(&n.id));
        let removed = before - inner.pending.len();
        if removed > 0 {
            tracing::debug!(pattern, removed, "notifications cleared");
            self.promote(&mut inner);
        }
        removed
    }

    /// Invoke the action of the notification with `key`. Returns `false` if
    /// there is no such notification or it has no action.
    pub fn trigger_action(&self, key: u64) -> bool {
        let action = {
            let inner = self.inner.lock();
            inner.pending.iter().find(|n| n.key == key).and_then(|n| n.action.clone())
        };
        match action {
            Some(action) => {
                action.invoke();
                true
            }
            None => false,
        }
    }

    pub fn current_notification(&self) -> Option<Notification> {
        self.inner.lock().pending.first().cloned()
    }

    /// Pending notifications, head (current) first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().pending.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dismiss_shown(&self, inner: &mut QueueInner, preempted: bool) {
        if let Some((key, id)) = inner.shown.take() {
            self.events.publish(ServiceEvent::NotificationDismissed { key, id, preempted });
        }
    }

    /// Announce the head as current if it changed.
    fn promote(&self, inner: &mut QueueInner) {
        let head_key = inner.pending.first().map(|n| n.key);
        if inner.shown.as_ref().map(|(k, _)| *k) == head_key {
            return;
        }
        if let Some((shown_key, _)) = inner.shown {
            let still_pending = inner.pending.iter().any(|n| n.key == shown_key);
            self.dismiss_shown(inner, still_pending);
        }
        let Some(head) = inner.pending.first() else {
            return;
        };
        let (key, id, duration, view) = (head.key, head.id.clone(), head.duration, head.view());
        inner.shown = Some((key, id));
        inner.display_seq += 1;
        self.events.publish(ServiceEvent::NotificationShown { notification: view });
        if let Some(duration) = duration {
            self.expire_after(key, inner.display_seq, duration);
        }
    }

    /// Remove `key` once its display `seq` has lasted `duration`. A timer
    /// from an earlier display of the same notification does nothing.
    fn expire_after(&self, key: u64, seq: u64, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let this = self.this.clone();
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(queue) = this.upgrade() else {
                return;
            };
            let mut inner = queue.inner.lock();
            let same_display = inner.display_seq == seq
                && inner.shown.as_ref().is_some_and(|(shown, _)| *shown == key);
            if !same_display {
                return;
            }
            if let Some(at) = inner.pending.iter().position(|n| n.key == key) {
                inner.pending.remove(at);
                tracing::debug!(key, "notification expired");
                queue.promote(&mut inner);
            }
        });
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
