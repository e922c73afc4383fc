// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the connauth service.
#[derive(Debug, Clone, clap::Args)]
pub struct ConnectConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "CONNAUTH_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9810, env = "CONNAUTH_PORT")]
    pub port: u16,

    /// Bearer token for API auth. If unset, auth is disabled.
    #[arg(long, env = "CONNAUTH_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Origin popup messages must come from to be accepted.
    #[arg(long, default_value = "http://127.0.0.1:9810", env = "CONNAUTH_TRUSTED_ORIGIN")]
    pub trusted_origin: String,

    /// Public base URL of this service, used to build the OAuth redirect URI.
    #[arg(long, env = "CONNAUTH_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Seconds a user has to finish the provider round trip.
    #[arg(long, default_value_t = 60, env = "CONNAUTH_AUTH_TIMEOUT_SECS")]
    pub auth_timeout_secs: u64,

    /// Path to the connector catalog JSON file.
    #[arg(long, env = "CONNAUTH_CONNECTOR_CONFIG")]
    pub connector_config: Option<PathBuf>,

    /// Buffered events per `/ws/events` subscriber before it lags.
    #[arg(long, default_value_t = 256, env = "CONNAUTH_EVENT_CAPACITY")]
    pub event_capacity: usize,
}

impl ConnectConfig {
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Base URL the service is reachable at, falling back to the bind address.
    pub fn public_base(&self) -> String {
        match self.public_url {
            Some(ref url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Redirect URI registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/redirect", self.public_base())
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9810,
            auth_token: None,
            trusted_origin: "http://127.0.0.1:9810".into(),
            public_url: None,
            auth_timeout_secs: 60,
            connector_config: None,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_defaults_to_bind_address() {
        let config = ConnectConfig::default();
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:9810/auth/redirect");
        assert_eq!(config.auth_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn redirect_uri_uses_public_url() {
        let config = ConnectConfig {
            public_url: Some("https://auth.example.com/".into()),
            ..ConnectConfig::default()
        };
        assert_eq!(config.redirect_uri(), "https://auth.example.com/auth/redirect");
    }
}
