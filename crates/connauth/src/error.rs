// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the connauth API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    Unauthorized,
    BadRequest,
    ConnectorNotFound,
    NotificationNotFound,
    AuthProtocol,
    AuthFailed,
    Internal,
}

impl ApiError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::ConnectorNotFound => 404,
            Self::NotificationNotFound => 404,
            Self::AuthProtocol => 502,
            Self::AuthFailed => 502,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::ConnectorNotFound => "CONNECTOR_NOT_FOUND",
            Self::NotificationNotFound => "NOTIFICATION_NOT_FOUND",
            Self::AuthProtocol => "AUTH_PROTOCOL",
            Self::AuthFailed => "AUTH_FAILED",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FlowError> for ApiError {
    fn from(err: &FlowError) -> Self {
        match err {
            FlowError::Protocol(_) => Self::AuthProtocol,
            FlowError::Executor(_) => Self::AuthFailed,
            FlowError::Abandoned => Self::Internal,
        }
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Rejection reasons for a deferred authentication result.
///
/// Provider failures, timeouts and cancellation are *not* errors; they are
/// [`AuthOutcome`](crate::authorize::AuthOutcome) variants. Only these three
/// ever reach the caller of `create_process` as a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A trusted-origin window message that is not a valid envelope.
    Protocol(String),
    /// The executor failed before producing an outcome.
    Executor(String),
    /// The resolver was dropped without settling.
    Abandoned,
}

impl FlowError {
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol(detail.into())
    }

    pub fn executor(err: &anyhow::Error) -> Self {
        Self::Executor(format!("{err:#}"))
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(detail) => write!(f, "authorization protocol error: {detail}"),
            Self::Executor(detail) => write!(f, "authorization could not start: {detail}"),
            Self::Abandoned => f.write_str("authorization flow dropped without a result"),
        }
    }
}

impl std::error::Error for FlowError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
