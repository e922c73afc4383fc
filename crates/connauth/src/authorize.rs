// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The popup authorization round trip.
//!
//! Opens one popup, then races three completion sources against a shared
//! [`deferred`] cell:
//!
//! - a trusted message from the popup (`AuthorizationComplete` or
//!   `AuthorizationFailed`, or a protocol error),
//! - the authorization timer,
//! - the flow's cancel token.
//!
//! The first to settle the cell wins. The losers are aborted afterwards, but
//! even if one fires first its write is a no-op. The popup is closed and the
//! window listener dropped before the outcome is returned.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::{AuthEnvelope, MessageChannel, WindowId};
use crate::connector::{AuthorizationRequest, ConnectorProvider};
use crate::deferred::deferred;
use crate::flow::Executor;
use crate::popup::{PopupHandle, PopupOpener};

/// Default time a user has to finish the provider round trip.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(60);

/// Terminal classification of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AuthOutcome {
    Authentified,
    Canceled,
    Timeout,
    Error(String),
}

impl AuthOutcome {
    pub fn is_authentified(&self) -> bool {
        matches!(self, Self::Authentified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentified => "authentified",
            Self::Canceled => "canceled",
            Self::Timeout => "timeout",
            Self::Error(_) => "error",
        }
    }
}

impl From<AuthEnvelope> for AuthOutcome {
    fn from(envelope: AuthEnvelope) -> Self {
        match envelope {
            AuthEnvelope::AuthorizationComplete => Self::Authentified,
            AuthEnvelope::AuthorizationFailed { reason } => Self::Error(reason),
        }
    }
}

/// Runs popup round trips over a shared message channel.
pub struct Authorizer {
    channel: Arc<MessageChannel>,
    opener: Arc<dyn PopupOpener>,
    timeout: Duration,
}

impl Authorizer {
    pub fn new(
        channel: Arc<MessageChannel>,
        opener: Arc<dyn PopupOpener>,
        timeout: Duration,
    ) -> Self {
        Self { channel, opener, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a popup for `request` and wait for the first of message, timeout
    /// or cancellation.
    ///
    /// Errors: the popup could not be opened, or a trusted message was not a
    /// valid envelope (a [`FlowError::Protocol`](crate::error::FlowError)
    /// wrapped in `anyhow`).
    pub async fn authorize(
        &self,
        connector: &str,
        request: &AuthorizationRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<AuthOutcome> {
        let window = WindowId::generate();
        // Listen before the popup exists so no message can slip past.
        let mut listener = self.channel.listen(window.clone());
        let popup = PopupHandle::new(self.opener.open(&window, connector, &request.url_for(&window))?);
        tracing::info!(connector, window = %window, "authorization popup opened");

        let (resolver, result) = deferred::<AuthOutcome>();

        let message_task = tokio::spawn({
            let resolver = resolver.clone();
            async move {
                match listener.next().await {
                    Some(Ok(envelope)) => resolver.resolve(envelope.into()),
                    Some(Err(e)) => resolver.reject(e),
                    None => false,
                }
            }
        });
        let timer_task = tokio::spawn({
            let resolver = resolver.clone();
            let timeout = self.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                resolver.resolve(AuthOutcome::Timeout)
            }
        });
        let cancel_task = tokio::spawn({
            let resolver = resolver.clone();
            async move {
                cancel.cancelled().await;
                resolver.resolve(AuthOutcome::Canceled)
            }
        });
        drop(resolver);
        let mut race = RaceGuard { popup, tasks: vec![message_task, timer_task, cancel_task] };

        let settled = result.await;

        // Awaiting the aborted tasks guarantees the listener and timer are
        // dropped before the caller sees the outcome.
        for task in race.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        race.popup.close();

        match &settled {
            Ok(outcome) => {
                tracing::info!(connector, window = %window, outcome = outcome.as_str(), "authorization settled")
            }
            Err(e) => tracing::warn!(connector, window = %window, err = %e, "authorization rejected"),
        }
        Ok(settled?)
    }
}

/// Closes the popup and aborts the race tasks if `authorize` is dropped
/// before it settles.
struct RaceGuard {
    popup: PopupHandle,
    tasks: Vec<JoinHandle<bool>>,
}

impl Drop for RaceGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if self.popup.close() {
            tracing::debug!(window = %self.popup.window(), "authorization dropped, popup closed");
        }
    }
}

/// Executor that fetches the connector's endpoint details and runs the popup
/// round trip.
pub fn popup_executor(
    authorizer: Arc<Authorizer>,
    connectors: Arc<dyn ConnectorProvider>,
    connector_id: String,
    redirect_uri: String,
) -> Executor {
    Box::new(move |cancel: CancellationToken| {
        Box::pin(async move {
            let endpoint = connectors.authorization(&connector_id).await?;
            let request = AuthorizationRequest::new(endpoint, redirect_uri);
            authorizer.authorize(&connector_id, &request, cancel).await
        })
    })
}

#[cfg(test)]
#[path = "authorize_tests.rs"]
mod tests;
