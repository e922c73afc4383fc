// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::events::EventFeed;

use super::*;

fn bridge() -> NotificationBridge {
    NotificationBridge::new(NotificationQueue::new(Arc::new(EventFeed::new(16))))
}

#[yare::parameterized(
    authentified = { AuthOutcome::Authentified, None },
    canceled = { AuthOutcome::Canceled, None },
    timeout = { AuthOutcome::Timeout, Some("Authentication to Google Sheets failed (timeout)") },
    error = {
        AuthOutcome::Error("access_denied".into()),
        Some("Authentication to Google Sheets failed")
    },
)]
fn outcome_messages(outcome: AuthOutcome, expected: Option<&str>) {
    let n = notification_for("Google Sheets", "conn-1", &outcome);
    assert_eq!(n.as_ref().map(|n| n.message.as_str()), expected);
    if let Some(n) = n {
        assert_eq!(n.id, "connector-auth-failed-conn-1");
        assert_eq!(n.kind, NotificationKind::Negative);
        assert!(n.action.is_none());
    }
}

#[tokio::test]
async fn report_pushes_one_negative_per_failure() {
    let bridge = bridge();
    bridge.report("Sheets", "conn-1", &AuthOutcome::Authentified);
    bridge.report("Sheets", "conn-1", &AuthOutcome::Canceled);
    assert!(bridge.queue().is_empty());

    bridge.report("Sheets", "conn-1", &AuthOutcome::Timeout);
    assert_eq!(bridge.queue().len(), 1);
    let current = bridge.queue().current_notification();
    assert_eq!(current.map(|n| n.kind), Some(NotificationKind::Negative));
}

#[tokio::test]
async fn clear_failures_only_touches_that_connector() {
    let bridge = bridge();
    bridge.report("Sheets", "conn-1", &AuthOutcome::Timeout);
    bridge.report("Dropbox", "conn-2", &AuthOutcome::Error("nope".into()));

    assert_eq!(bridge.clear_failures("conn-1"), 1);
    let remaining: Vec<String> = bridge.queue().notifications().into_iter().map(|n| n.id).collect();
    assert_eq!(remaining, ["connector-auth-failed-conn-2"]);
}

#[tokio::test]
async fn clear_failures_respects_id_boundaries() {
    let bridge = bridge();
    bridge.report("Sheets", "conn-1", &AuthOutcome::Timeout);
    bridge.report("Sheets 10", "conn-10", &AuthOutcome::Timeout);
    bridge.queue().add_notification(Notification::new(
        "connector-auth-failed-conn-1:retry",
        "Retry Sheets",
        NotificationKind::Informative,
    ));

    assert_eq!(bridge.clear_failures("conn-1"), 2);
    let remaining: Vec<String> = bridge.queue().notifications().into_iter().map(|n| n.id).collect();
    assert_eq!(remaining, ["connector-auth-failed-conn-10"]);
}
