// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication orchestrator: the public entry point for connector flows.
//!
//! ```text
//! create_process(executor, name, id) ──► registry ──► DeferredResult (caller awaits)
//! process(id)?.start() ──► executor ──► bridge ──► resolve(Some(Refreshed) | None)
//! process(id)?.cancel() ──────────────────────────► resolve(None)
//! ```
//!
//! A flow leaves the registry before its result is settled, on every path.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::bridge::NotificationBridge;
use crate::deferred::DeferredResult;
use crate::error::FlowError;
use crate::events::{EventFeed, ServiceEvent};
use crate::flow::{CredentialsRefreshed, Executor, FlowInfo, FlowRegistry, FlowResult, FlowTicket};

pub struct AuthOrchestrator {
    registry: FlowRegistry,
    bridge: NotificationBridge,
    events: Arc<EventFeed>,
}

impl AuthOrchestrator {
    pub fn new(bridge: NotificationBridge, events: Arc<EventFeed>) -> Arc<Self> {
        Arc::new(Self { registry: FlowRegistry::new(), bridge, events })
    }

    /// Register a flow for `connector_id` and return the result its caller
    /// waits on. Supersedes any flow already registered under that id.
    pub fn create_process(
        &self,
        executor: Executor,
        connector_name: &str,
        connector_id: &str,
    ) -> DeferredResult<FlowResult> {
        let (ticket, result) = self.registry.register(connector_id, connector_name, executor);
        tracing::info!(connector = connector_id, name = connector_name, generation = ticket.generation, "flow registered");
        result
    }

    /// Controller for the flow registered under `connector_id`, or `None` if
    /// there is none. A miss is not an error.
    pub fn process(self: &Arc<Self>, connector_id: &str) -> Option<FlowController> {
        let Some(ticket) = self.registry.lookup(connector_id) else {
            tracing::debug!(connector = connector_id, "no flow registered");
            return None;
        };
        Some(FlowController { orchestrator: Arc::clone(self), ticket })
    }

    pub fn is_registered(&self, connector_id: &str) -> bool {
        self.registry.contains(connector_id)
    }

    pub fn flows(&self) -> Vec<FlowInfo> {
        self.registry.snapshot()
    }

    pub fn bridge(&self) -> &NotificationBridge {
        &self.bridge
    }

    fn settled(&self, ticket: &FlowTicket, outcome: &str) {
        self.events.publish(ServiceEvent::FlowSettled {
            connector: ticket.connector_id.clone(),
            outcome: outcome.to_owned(),
        });
    }
}

/// Start/cancel handle for one registered flow.
pub struct FlowController {
    orchestrator: Arc<AuthOrchestrator>,
    ticket: FlowTicket,
}

impl FlowController {
    pub fn connector_id(&self) -> &str {
        &self.ticket.connector_id
    }

    /// Run the flow's executor and settle the flow with its outcome.
    ///
    /// Idempotent: a second call, or a call after the flow settled, does
    /// nothing. If this future is dropped before the executor finishes, the
    /// flow is unregistered and its caller rejected with
    /// [`FlowError::Abandoned`]. A panicking executor rejects with
    /// [`FlowError::Executor`].
    pub async fn start(&self) {
        let orch = &self.orchestrator;
        let ticket = &self.ticket;
        let Some((executor, cancel)) = orch.registry.take_executor(ticket) else {
            tracing::debug!(connector = %ticket.connector_id, "flow already started or settled");
            return;
        };
        let guard = AbandonGuard { orchestrator: orch, ticket, armed: true };
        orch.bridge.clear_failures(&ticket.connector_id);
        tracing::info!(connector = %ticket.connector_id, "flow started");

        let result = AssertUnwindSafe(async move { executor(cancel).await }).catch_unwind().await;
        guard.disarm();

        let Some(flow) = orch.registry.remove(ticket) else {
            // Canceled or superseded while running; already settled.
            tracing::debug!(connector = %ticket.connector_id, "flow settled elsewhere, dropping outcome");
            return;
        };

        let result = result.unwrap_or_else(|payload| {
            Err(anyhow::Error::new(FlowError::Executor(format!(
                "executor panicked: {}",
                panic_message(payload.as_ref())
            ))))
        });

        match result {
            Ok(outcome) => {
                orch.bridge.report(&ticket.connector_name, &ticket.connector_id, &outcome);
                orch.settled(ticket, outcome.as_str());
                flow.resolver.resolve(outcome.is_authentified().then_some(CredentialsRefreshed));
            }
            Err(err) => {
                let err = match err.downcast::<FlowError>() {
                    Ok(flow_err) => flow_err,
                    Err(other) => FlowError::executor(&other),
                };
                tracing::warn!(connector = %ticket.connector_id, err = %err, "flow rejected");
                orch.settled(ticket, "rejected");
                flow.resolver.reject(err);
            }
        }
    }

    /// Settle the flow with `None` right away and unregister it. Fires the
    /// flow's cancel token so a running popup closes. No-op once settled.
    pub fn cancel(&self) {
        let orch = &self.orchestrator;
        let Some(flow) = orch.registry.remove(&self.ticket) else {
            return;
        };
        flow.cancel.cancel();
        tracing::info!(connector = %self.ticket.connector_id, "flow canceled");
        orch.settled(&self.ticket, "canceled");
        flow.resolver.resolve(None);
    }
}

/// Settles a started flow as abandoned if `start()` never gets to.
struct AbandonGuard<'a> {
    orchestrator: &'a AuthOrchestrator,
    ticket: &'a FlowTicket,
    armed: bool,
}

impl AbandonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(flow) = self.orchestrator.registry.remove(self.ticket) else {
            return;
        };
        flow.cancel.cancel();
        tracing::warn!(connector = %self.ticket.connector_id, "flow dropped before settling");
        self.orchestrator.settled(self.ticket, "abandoned");
        flow.resolver.reject(FlowError::Abandoned);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
