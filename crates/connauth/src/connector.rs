// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector metadata and authorization URL construction.
//!
//! Where connector metadata comes from is not this crate's business; it only
//! needs a [`ConnectorProvider`]. The service ships a [`StaticCatalog`]
//! loaded from `--connector-config <path>`.

use std::path::Path;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::channel::WindowId;

/// Top-level catalog file loaded from `--connector-config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub connectors: Vec<ConnectorConfig>,
}

/// One connector entry in the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    /// Display label.
    pub name: String,
    pub authorization: AuthorizationEndpoint,
}

/// Details needed to point a popup at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationEndpoint {
    pub client_id: String,
    #[serde(default)]
    pub scope: String,
    pub authorization_endpoint: String,
}

/// Display metadata for a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorMetadata {
    pub id: String,
    pub name: String,
}

/// Source of connector metadata and authorization endpoint details.
pub trait ConnectorProvider: Send + Sync {
    fn metadata(&self, connector_id: &str) -> Option<ConnectorMetadata>;

    fn list(&self) -> Vec<ConnectorMetadata>;

    fn authorization<'a>(
        &'a self,
        connector_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<AuthorizationEndpoint>>;
}

/// In-memory catalog, ordered as declared.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    connectors: IndexMap<String, ConnectorConfig>,
}

impl StaticCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        let mut connectors = IndexMap::new();
        for c in config.connectors {
            if connectors.contains_key(&c.id) {
                tracing::warn!(connector = %c.id, "duplicate connector id in catalog, keeping last");
            }
            connectors.insert(c.id.clone(), c);
        }
        Self { connectors }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CatalogConfig = serde_json::from_str(&contents)?;
        Ok(Self::new(config))
    }
}

impl ConnectorProvider for StaticCatalog {
    fn metadata(&self, connector_id: &str) -> Option<ConnectorMetadata> {
        self.connectors
            .get(connector_id)
            .map(|c| ConnectorMetadata { id: c.id.clone(), name: c.name.clone() })
    }

    fn list(&self) -> Vec<ConnectorMetadata> {
        self.connectors
            .values()
            .map(|c| ConnectorMetadata { id: c.id.clone(), name: c.name.clone() })
            .collect()
    }

    fn authorization<'a>(
        &'a self,
        connector_id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<AuthorizationEndpoint>> {
        Box::pin(async move {
            self.connectors
                .get(connector_id)
                .map(|c| c.authorization.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown connector: {connector_id}"))
        })
    }
}

/// An authorization endpoint bound to this service's redirect URI.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub endpoint: AuthorizationEndpoint,
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    pub fn new(endpoint: AuthorizationEndpoint, redirect_uri: impl Into<String>) -> Self {
        Self { endpoint, redirect_uri: redirect_uri.into() }
    }

    /// Popup target URL. The window id travels as `state` so the redirect
    /// page can address its message back to the right flow.
    pub fn url_for(&self, window: &WindowId) -> String {
        build_auth_url(
            &self.endpoint.authorization_endpoint,
            &self.endpoint.client_id,
            &self.redirect_uri,
            &self.endpoint.scope,
            window.as_str(),
        )
    }
}

/// Build the full authorization URL.
pub fn build_auth_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> String {
    let sep = if auth_url.contains('?') { '&' } else { '?' };
    format!(
        "{auth_url}{sep}client_id={client_id}\
         &response_type=code\
         &redirect_uri={redirect_uri}\
         &scope={scope}\
         &state={state}",
        client_id = urlencoding(client_id),
        redirect_uri = urlencoding(redirect_uri),
        scope = urlencoding(scope),
        state = urlencoding(state),
    )
}

/// Form-style encoding for URL query parameters (spaces as `+`).
fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
