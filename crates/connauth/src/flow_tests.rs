// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn noop_executor() -> Executor {
    Box::new(|_cancel: CancellationToken| Box::pin(async { Ok::<_, anyhow::Error>(AuthOutcome::Authentified) }))
}

#[tokio::test]
async fn register_and_lookup() {
    let registry = FlowRegistry::new();
    assert!(registry.is_empty());

    let (ticket, _result) = registry.register("conn-1", "Google Sheets", noop_executor());
    assert_eq!(registry.lookup("conn-1"), Some(ticket.clone()));
    assert_eq!(ticket.connector_name, "Google Sheets");
    assert!(registry.contains("conn-1"));
    assert!(registry.lookup("conn-2").is_none());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn second_registration_supersedes_first() -> anyhow::Result<()> {
    let registry = FlowRegistry::new();
    let (first, first_result) = registry.register("conn-1", "Sheets", noop_executor());
    let first_cancel = registry.take_executor(&first).map(|(_, c)| c);

    let (second, _second_result) = registry.register("conn-1", "Sheets", noop_executor());
    assert_ne!(first.generation, second.generation);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("conn-1"), Some(second.clone()));

    // The superseded caller is released with "nothing refreshed".
    assert_eq!(first_result.await?, None);
    assert!(first_cancel.is_some_and(|c| c.is_cancelled()));

    // Cleanup for the old ticket must not touch the new flow.
    assert!(registry.remove(&first).is_none());
    assert!(registry.take_executor(&first).is_none());
    assert!(registry.contains("conn-1"));
    assert!(registry.remove(&second).is_some());
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn executor_can_be_taken_once() {
    let registry = FlowRegistry::new();
    let (ticket, _result) = registry.register("conn-1", "Sheets", noop_executor());

    assert!(!registry.snapshot()[0].started);
    assert!(registry.take_executor(&ticket).is_some());
    assert!(registry.take_executor(&ticket).is_none());
    assert!(registry.snapshot()[0].started);
}

#[tokio::test]
async fn snapshot_keeps_registration_order() {
    let registry = FlowRegistry::new();
    let _a = registry.register("a", "A", noop_executor());
    let _b = registry.register("b", "B", noop_executor());
    let _a2 = registry.register("a", "A again", noop_executor());

    let ids: Vec<String> = registry.snapshot().into_iter().map(|f| f.connector).collect();
    assert_eq!(ids, ["b", "a"]);
}
