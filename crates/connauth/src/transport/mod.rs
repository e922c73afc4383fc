// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the connauth service.

pub mod auth;
pub mod http;
pub mod relay;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` with all connauth routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        // Connectors and flows
        .route("/api/v1/connectors", get(http::list_connectors))
        .route("/api/v1/connectors/{id}/authorize", post(http::authorize_connector))
        .route("/api/v1/connectors/{id}/cancel", post(http::cancel_connector))
        .route("/api/v1/flows", get(http::list_flows))
        // Notifications
        .route(
            "/api/v1/notifications",
            get(http::list_notifications).delete(http::remove_notifications),
        )
        .route("/api/v1/notifications/{key}", delete(http::remove_notification))
        .route("/api/v1/notifications/{key}/action", post(http::trigger_action))
        // Popup side (no bearer auth)
        .route("/api/v1/messages", post(relay::post_message))
        .route("/auth/redirect", get(relay::redirect_page))
        // Event stream
        .route("/ws/events", get(ws::ws_handler))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
