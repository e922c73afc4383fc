// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of in-flight authentication flows, keyed by connector id.
//!
//! At most one flow exists per connector id. Registering again supersedes the
//! previous flow: it is settled with `None` and its cancel token fires. Every
//! flow carries a generation number so cleanup of a superseded flow can never
//! remove its replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::authorize::AuthOutcome;
use crate::deferred::{deferred, DeferredResult, Resolver};

/// Starts the external authorization round trip. Receives the flow's cancel
/// token and yields the terminal outcome.
pub type Executor =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, anyhow::Result<AuthOutcome>> + Send>;

/// Marker value: the connector's credentials were refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialsRefreshed;

/// What the caller of `create_process` eventually receives.
pub type FlowResult = Option<CredentialsRefreshed>;

/// A registered flow.
pub(crate) struct AuthFlow {
    pub connector_name: String,
    pub generation: u64,
    pub resolver: Resolver<FlowResult>,
    pub cancel: CancellationToken,
    executor: Option<Executor>,
    registered_at: Instant,
}

/// Identifies one specific registration of a connector id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowTicket {
    pub connector_id: String,
    pub connector_name: String,
    pub generation: u64,
}

/// Snapshot of a registered flow.
#[derive(Debug, Clone, Serialize)]
pub struct FlowInfo {
    pub connector: String,
    pub name: String,
    pub started: bool,
    pub age_ms: u64,
}

#[derive(Default)]
pub struct FlowRegistry {
    flows: Mutex<IndexMap<String, AuthFlow>>,
    next_generation: AtomicU64,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow for `connector_id`, superseding any existing one.
    pub fn register(
        &self,
        connector_id: &str,
        connector_name: &str,
        executor: Executor,
    ) -> (FlowTicket, DeferredResult<FlowResult>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (resolver, result) = deferred();
        let flow = AuthFlow {
            connector_name: connector_name.to_owned(),
            generation,
            resolver,
            cancel: CancellationToken::new(),
            executor: Some(executor),
            registered_at: Instant::now(),
        };

        // shift_remove + insert moves a re-registered id to the back.
        let previous = {
            let mut flows = self.flows.lock();
            let previous = flows.shift_remove(connector_id);
            flows.insert(connector_id.to_owned(), flow);
            previous
        };
        if let Some(prev) = previous {
            tracing::info!(connector = connector_id, superseded = prev.generation, "flow superseded");
            prev.cancel.cancel();
            prev.resolver.resolve(None);
        }

        let ticket = FlowTicket {
            connector_id: connector_id.to_owned(),
            connector_name: connector_name.to_owned(),
            generation,
        };
        (ticket, result)
    }

    /// Current registration for `connector_id`.
    pub fn lookup(&self, connector_id: &str) -> Option<FlowTicket> {
        self.flows.lock().get(connector_id).map(|f| FlowTicket {
            connector_id: connector_id.to_owned(),
            connector_name: f.connector_name.clone(),
            generation: f.generation,
        })
    }

    /// Take the executor out of the flow named by `ticket`. Returns `None` if
    /// the flow is gone, superseded, or already started.
    pub fn take_executor(&self, ticket: &FlowTicket) -> Option<(Executor, CancellationToken)> {
        let mut flows = self.flows.lock();
        let flow = flows.get_mut(&ticket.connector_id)?;
        if flow.generation != ticket.generation {
            return None;
        }
        let executor = flow.executor.take()?;
        Some((executor, flow.cancel.clone()))
    }

    /// Remove the flow named by `ticket`, if it is still the registered one.
    pub(crate) fn remove(&self, ticket: &FlowTicket) -> Option<AuthFlow> {
        let mut flows = self.flows.lock();
        match flows.get(&ticket.connector_id) {
            Some(f) if f.generation == ticket.generation => {
                flows.shift_remove(&ticket.connector_id)
            }
            _ => None,
        }
    }

    pub fn contains(&self, connector_id: &str) -> bool {
        self.flows.lock().contains_key(connector_id)
    }

    pub fn len(&self) -> usize {
        self.flows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered flows in registration order.
    pub fn snapshot(&self) -> Vec<FlowInfo> {
        self.flows
            .lock()
            .iter()
            .map(|(id, f)| FlowInfo {
                connector: id.clone(),
                name: f.connector_name.clone(),
                started: f.executor.is_none(),
                age_ms: f.registered_at.elapsed().as_millis() as u64,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
