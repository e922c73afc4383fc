// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Popup side of the message channel.
//!
//! The provider redirects the popup to `/auth/redirect`, which serves a page
//! that posts the result envelope back to its opener and to
//! `/api/v1/messages`, then closes itself. The relay forwards whatever it
//! receives onto the [`MessageChannel`](crate::channel::MessageChannel),
//! tagged with the request's `Origin`; filtering happens on the listening
//! side.
//!
//! `Origin` is only as trustworthy as the client sending it. Browsers also
//! send `Sec-Fetch-Site`, which page scripts cannot forge. When it says
//! the request came from another site, the message is relayed with an
//! empty origin so no listener accepts it. Non-browser clients that omit
//! the header can still claim any origin. Those messages must also name
//! the popup's window id to reach a listener.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;

use crate::channel::{AuthEnvelope, WindowId, WindowMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    pub window: String,
}

/// Query the provider appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    /// Window id passed as the OAuth `state` parameter.
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `POST /api/v1/messages?window=<id>`: post a popup message.
///
/// Always `202 Accepted`, whether or not a flow was listening.
pub async fn post_message(
    State(s): State<Arc<AppState>>,
    Query(query): Query<RelayQuery>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let origin = relay_origin(&headers);
    let delivered = s.channel.post(WindowMessage {
        origin,
        source: WindowId::from(query.window),
        data: body,
    });
    tracing::debug!(delivered, "popup message relayed");
    StatusCode::ACCEPTED
}

/// The origin a relayed message is tagged with. Empty when the browser
/// reports a cross-site request, whatever `Origin` claims.
pub fn relay_origin(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let origin = header("origin").unwrap_or_default();
    match header("sec-fetch-site") {
        None | Some("same-origin" | "same-site") => origin.to_owned(),
        Some(site) => {
            tracing::warn!(origin, site, "cross-site popup message dropped");
            String::new()
        }
    }
}

/// The envelope a redirect carries: a code means the provider granted
/// access, anything else is a failure.
pub fn envelope_for(query: &RedirectQuery) -> AuthEnvelope {
    if let Some(ref error) = query.error {
        let reason = query.error_description.clone().unwrap_or_else(|| error.clone());
        return AuthEnvelope::AuthorizationFailed { reason };
    }
    match query.code {
        Some(ref code) if !code.is_empty() => AuthEnvelope::AuthorizationComplete,
        _ => AuthEnvelope::AuthorizationFailed { reason: "missing authorization code".to_owned() },
    }
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_owned()).replace('<', "\\u003c")
}

/// `GET /auth/redirect`: page the provider sends the popup back to.
pub async fn redirect_page(Query(query): Query<RedirectQuery>) -> impl IntoResponse {
    let envelope = envelope_for(&query);
    let window = query.state.unwrap_or_default();
    if window.is_empty() {
        tracing::warn!("redirect without state, result cannot be routed");
    }
    Html(render_redirect(&envelope, &window))
}

fn render_redirect(envelope: &AuthEnvelope, window: &str) -> String {
    let envelope = script_json(envelope);
    let window = script_json(&window);
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Authorization</title></head>
<body>
<p>You can close this window.</p>
<script>
const envelope = {envelope};
const windowId = {window};
const body = JSON.stringify(envelope);
if (window.opener) {{
  window.opener.postMessage(body, "*");
}}
fetch("/api/v1/messages?window=" + encodeURIComponent(windowId), {{
  method: "POST",
  headers: {{ "content-type": "application/json" }},
  body,
}}).finally(() => window.close());
</script>
</body>
</html>
"#
    )
}
