// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;

const TRUSTED: &str = "https://editor.example.com";

fn message(origin: &str, window: &WindowId, data: &str) -> WindowMessage {
    WindowMessage { origin: origin.to_owned(), source: window.clone(), data: data.to_owned() }
}

#[yare::parameterized(
    complete = { r#"{"type":"AuthorizationComplete"}"#, AuthEnvelope::AuthorizationComplete },
    complete_extra_fields = {
        r#"{"type":"AuthorizationComplete","state":"abc"}"#,
        AuthEnvelope::AuthorizationComplete
    },
    failed = {
        r#"{"type":"AuthorizationFailed","reason":"access_denied"}"#,
        AuthEnvelope::AuthorizationFailed { reason: "access_denied".into() }
    },
)]
fn parses_known_envelopes(data: &str, expected: AuthEnvelope) {
    assert_eq!(parse_envelope(data), Ok(expected));
}

#[yare::parameterized(
    not_json = { "AuthorizationComplete" },
    no_type = { r#"{"reason":"x"}"# },
    non_string_type = { r#"{"type":7}"# },
    unknown_type = { r#"{"type":"AuthorizationPending"}"# },
    failed_without_reason = { r#"{"type":"AuthorizationFailed"}"# },
    array = { r#"[{"type":"AuthorizationComplete"}]"# },
)]
fn rejects_malformed_envelopes(data: &str) {
    assert!(matches!(parse_envelope(data), Err(FlowError::Protocol(_))), "{data} should be rejected");
}

#[yare::parameterized(
    exact = { "https://editor.example.com", true },
    trailing_slash = { "https://editor.example.com/", true },
    other_host = { "https://evil.example.com", false },
    other_scheme = { "http://editor.example.com", false },
    empty = { "", false },
)]
fn origin_matching(origin: &str, expected: bool) {
    assert_eq!(origin_matches(TRUSTED, origin), expected);
}

#[tokio::test]
async fn listener_receives_trusted_message_for_its_window() -> anyhow::Result<()> {
    let channel = MessageChannel::new(TRUSTED, 16);
    let window = WindowId::generate();
    let mut listener = channel.listen(window.clone());

    channel.post(message(TRUSTED, &window, r#"{"type":"AuthorizationComplete"}"#));
    let got = listener.next().await;
    assert_eq!(got, Some(Ok(AuthEnvelope::AuthorizationComplete)));
    Ok(())
}

#[tokio::test]
async fn listener_skips_untrusted_origin_and_foreign_windows() -> anyhow::Result<()> {
    let channel = MessageChannel::new(TRUSTED, 16);
    let window = WindowId::generate();
    let other = WindowId::generate();
    let mut listener = channel.listen(window.clone());

    channel.post(message("https://evil.example.com", &window, r#"{"type":"AuthorizationComplete"}"#));
    channel.post(message(TRUSTED, &other, r#"{"type":"AuthorizationComplete"}"#));
    channel.post(message(TRUSTED, &window, r#"{"type":"AuthorizationFailed","reason":"denied"}"#));

    let got = listener.next().await;
    assert_eq!(got, Some(Ok(AuthEnvelope::AuthorizationFailed { reason: "denied".into() })));
    Ok(())
}

#[tokio::test]
async fn untrusted_garbage_is_not_a_protocol_error() {
    let channel = MessageChannel::new(TRUSTED, 16);
    let window = WindowId::generate();
    let mut listener = channel.listen(window.clone());

    channel.post(message("https://evil.example.com", &window, "not json at all"));
    let res = tokio::time::timeout(Duration::from_millis(50), listener.next()).await;
    assert!(res.is_err(), "untrusted message must not surface");
}

#[tokio::test]
async fn trusted_garbage_is_a_protocol_error() {
    let channel = MessageChannel::new(TRUSTED, 16);
    let window = WindowId::generate();
    let mut listener = channel.listen(window.clone());

    channel.post(message(TRUSTED, &window, r#"{"type":"Nope"}"#));
    assert!(matches!(listener.next().await, Some(Err(FlowError::Protocol(_)))));
}

#[tokio::test]
async fn dropping_listener_unregisters_it() {
    let channel = MessageChannel::new(TRUSTED, 16);
    assert_eq!(channel.listener_count(), 0);
    let a = channel.listen(WindowId::generate());
    let b = channel.listen(WindowId::generate());
    assert_eq!(channel.listener_count(), 2);
    drop(a);
    assert_eq!(channel.listener_count(), 1);
    drop(b);
    assert_eq!(channel.listener_count(), 0);
    assert_eq!(channel.post(message(TRUSTED, &WindowId::generate(), "{}")), 0);
}

#[test]
fn window_id_is_transparent_in_json() -> anyhow::Result<()> {
    let id = WindowId::from("w-1");
    assert_eq!(serde_json::to_string(&id)?, r#""w-1""#);
    assert_eq!(id.to_string(), "w-1");
    assert_ne!(WindowId::generate(), WindowId::generate());
    Ok(())
}
