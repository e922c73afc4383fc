// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::authorize::Authorizer;
use crate::bridge::NotificationBridge;
use crate::channel::MessageChannel;
use crate::config::ConnectConfig;
use crate::connector::ConnectorProvider;
use crate::events::EventFeed;
use crate::notification::NotificationQueue;
use crate::orchestrator::AuthOrchestrator;
use crate::popup::{EventPopupOpener, PopupOpener};

/// Shared service state.
pub struct AppState {
    pub config: ConnectConfig,
    pub shutdown: CancellationToken,
    /// Event channel for `/ws/events` clients.
    pub events: Arc<EventFeed>,
    pub channel: Arc<MessageChannel>,
    pub connectors: Arc<dyn ConnectorProvider>,
    pub authorizer: Arc<Authorizer>,
    pub notifications: Arc<NotificationQueue>,
    pub orchestrator: Arc<AuthOrchestrator>,
}

impl AppState {
    /// Wire the service around `connectors`, opening popups through the
    /// event feed.
    pub fn new(
        config: ConnectConfig,
        connectors: Arc<dyn ConnectorProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        let events = Arc::new(EventFeed::new(config.event_capacity));
        let opener: Arc<dyn PopupOpener> = Arc::new(EventPopupOpener::new(Arc::clone(&events)));
        Self::with_opener(config, connectors, opener, events, shutdown)
    }

    pub fn with_opener(
        config: ConnectConfig,
        connectors: Arc<dyn ConnectorProvider>,
        opener: Arc<dyn PopupOpener>,
        events: Arc<EventFeed>,
        shutdown: CancellationToken,
    ) -> Self {
        let channel = Arc::new(MessageChannel::new(
            config.trusted_origin.clone(),
            config.event_capacity,
        ));
        let authorizer =
            Arc::new(Authorizer::new(Arc::clone(&channel), opener, config.auth_timeout()));
        let notifications = NotificationQueue::new(Arc::clone(&events));
        let orchestrator = AuthOrchestrator::new(
            NotificationBridge::new(Arc::clone(&notifications)),
            Arc::clone(&events),
        );
        Self {
            config,
            shutdown,
            events,
            channel,
            connectors,
            authorizer,
            notifications,
            orchestrator,
        }
    }
}
