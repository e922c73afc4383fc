// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws/events`: service events for the UI shell.
//!
//! On connect the client receives the currently displayed notification (if
//! any), then every [`ServiceEvent`] as it is published. Popups the shell
//! must open arrive as `popup_opened`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::events::ServiceEvent;
use crate::state::AppState;
use crate::transport::auth;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Auth token.
    pub token: Option<String>,
    /// Only forward connector events for this connector id.
    pub connector: Option<String>,
}

/// `GET /ws/events`: WebSocket upgrade for the service event stream.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if let Err(code) =
        auth::validate_ws_token(query.token.as_deref(), state.config.auth_token.as_deref())
    {
        return code.to_http_response("unauthorized").into_response();
    }

    ws.on_upgrade(move |socket| handle_connection(state, query.connector, socket)).into_response()
}

/// Whether a client filtering on `connector` wants `event`. Notification
/// events are not connector-scoped and always pass.
fn wants(connector: Option<&str>, event: &ServiceEvent) -> bool {
    match (connector, event.connector()) {
        (Some(wanted), Some(actual)) => wanted == actual,
        _ => true,
    }
}

async fn send_event(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &ServiceEvent,
) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => tx.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!(err = %e, "failed to encode service event");
            true
        }
    }
}

/// Per-connection event loop.
async fn handle_connection(state: Arc<AppState>, connector: Option<String>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut events = state.events.subscribe();

    if let Some(current) = state.notifications.current_notification() {
        let shown = ServiceEvent::NotificationShown { notification: current.view() };
        if !send_event(&mut ws_tx, &shown).await {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(e) => e,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "event client lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if wants(connector.as_deref(), &event) && !send_event(&mut ws_tx, &event).await {
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
            _ = state.shutdown.cancelled() => break,
        }
    }
}
