// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for connectors, flows and notifications.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::authorize::popup_executor;
use crate::connector::ConnectorMetadata;
use crate::error::ApiError;
use crate::flow::FlowInfo;
use crate::notification::NotificationView;
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub flows: usize,
    pub notifications: usize,
}

#[derive(Debug, Serialize)]
pub struct ConnectorsResponse {
    pub connectors: Vec<ConnectorMetadata>,
}

#[derive(Debug, Serialize)]
pub struct FlowsResponse {
    pub flows: Vec<FlowInfo>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub connector: String,
    pub refreshed: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub connector: String,
    pub canceled: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub current: Option<NotificationView>,
    /// Queued behind `current`, in display order.
    pub pending: Vec<NotificationView>,
}

#[derive(Debug, Deserialize)]
pub struct PrefixQuery {
    pub prefix: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub key: u64,
    pub triggered: bool,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        flows: s.orchestrator.flows().len(),
        notifications: s.notifications.len(),
    })
}

/// `GET /api/v1/connectors`
pub async fn list_connectors(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ConnectorsResponse { connectors: s.connectors.list() })
}

/// `GET /api/v1/flows`
pub async fn list_flows(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(FlowsResponse { flows: s.orchestrator.flows() })
}

/// `POST /api/v1/connectors/{id}/authorize`: run a popup flow and wait for
/// it to settle.
pub async fn authorize_connector(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(connector) = s.connectors.metadata(&id) else {
        return ApiError::ConnectorNotFound
            .to_http_response(format!("unknown connector: {id}"))
            .into_response();
    };

    let executor = popup_executor(
        Arc::clone(&s.authorizer),
        Arc::clone(&s.connectors),
        id.clone(),
        s.config.redirect_uri(),
    );
    let result = s.orchestrator.create_process(executor, &connector.name, &id);

    // The flow must keep running if this request goes away.
    if let Some(controller) = s.orchestrator.process(&id) {
        tokio::spawn(async move { controller.start().await });
    }

    match result.await {
        Ok(refreshed) => {
            Json(AuthorizeResponse { connector: id, refreshed: refreshed.is_some() })
                .into_response()
        }
        Err(e) => ApiError::from(&e).to_http_response(e.to_string()).into_response(),
    }
}

/// `POST /api/v1/connectors/{id}/cancel`
pub async fn cancel_connector(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let canceled = match s.orchestrator.process(&id) {
        Some(controller) => {
            controller.cancel();
            true
        }
        None => false,
    };
    Json(CancelResponse { connector: id, canceled })
}

/// `GET /api/v1/notifications`
pub async fn list_notifications(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let mut views = s.notifications.notifications().iter().map(|n| n.view()).collect::<Vec<_>>();
    let current = if views.is_empty() { None } else { Some(views.remove(0)) };
    Json(NotificationsResponse { current, pending: views })
}

/// `DELETE /api/v1/notifications?prefix=...`
pub async fn remove_notifications(
    State(s): State<Arc<AppState>>,
    Query(query): Query<PrefixQuery>,
) -> impl IntoResponse {
    Json(RemovedResponse { removed: s.notifications.remove_notifications(&query.prefix) })
}

/// `DELETE /api/v1/notifications/{key}`
pub async fn remove_notification(
    State(s): State<Arc<AppState>>,
    Path(key): Path<u64>,
) -> impl IntoResponse {
    match s.notifications.remove_by_key(key) {
        Some(_) => Json(RemovedResponse { removed: 1 }).into_response(),
        None => ApiError::NotificationNotFound
            .to_http_response(format!("no notification with key {key}"))
            .into_response(),
    }
}

/// `POST /api/v1/notifications/{key}/action`
pub async fn trigger_action(
    State(s): State<Arc<AppState>>,
    Path(key): Path<u64>,
) -> impl IntoResponse {
    if s.notifications.trigger_action(key) {
        Json(ActionResponse { key, triggered: true }).into_response()
    } else {
        ApiError::NotificationNotFound
            .to_http_response(format!("no notification with an action under key {key}"))
            .into_response()
    }
}
