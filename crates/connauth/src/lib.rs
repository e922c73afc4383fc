// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connauth: connector authentication orchestrator.
//!
//! Runs OAuth-style popup flows for data connectors, one per connector at a
//! time, and reports failures through a priority notification queue.

pub mod authorize;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod connector;
pub mod deferred;
pub mod error;
pub mod events;
pub mod flow;
pub mod notification;
pub mod orchestrator;
pub mod popup;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectConfig;
use crate::connector::{CatalogConfig, ConnectorProvider, StaticCatalog};
use crate::state::AppState;
use crate::transport::build_router;

/// Run the service until shutdown.
pub async fn run(config: ConnectConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    // Empty catalog if no file provided.
    let catalog = match config.connector_config {
        Some(ref path) => StaticCatalog::load(path)?,
        None => StaticCatalog::new(CatalogConfig::default()),
    };
    let connectors: Arc<dyn ConnectorProvider> = Arc::new(catalog);
    let connector_count = connectors.list().len();

    let state = Arc::new(AppState::new(config, connectors, shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    tracing::info!(
        connectors = connector_count,
        trusted_origin = %state.config.trusted_origin,
        "connauth listening on {addr}"
    );
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
