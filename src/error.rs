//! Error types for the cache engine and the request executor
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache engine and its configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (bad key, bad TTL, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Compressing or decompressing a payload failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Serializing a value (size estimation, export) failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            CacheError::Compression(_)
            | CacheError::Serialization(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Executor Errors ==

/// Error code attached when the retry budget is exhausted.
pub const MAX_RETRIES_EXCEEDED: &str = "MAX_RETRIES_EXCEEDED";

/// Status code reported for per-attempt timeouts.
pub const TIMEOUT_STATUS: u16 = 408;

/// Status code reported for connection-level failures that never produced a response.
pub const NETWORK_ERROR_STATUS: u16 = 503;

/// Broad class of an executor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 4xx response, never retried.
    Client,
    /// 5xx response, retried.
    Server,
    /// Connection or transport failure, retried.
    Network,
    /// Per-attempt timeout elapsed, retried.
    Timeout,
    /// Every attempt failed with a retryable error.
    MaxRetriesExceeded,
    /// The credential provider could not supply credentials.
    Credentials,
}

impl ErrorKind {
    /// Whether another attempt may be made after an error of this kind.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Server | Self::Network | Self::Timeout)
    }
}

/// Error surfaced by the request executor.
///
/// Serializes to `{message, statusCode, errorCode?, errorType?, details?}` no
/// matter which path produced it.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    #[serde(skip)]
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Last retryable error, set on `MaxRetriesExceeded`.
    #[serde(skip)]
    #[source]
    pub cause: Option<Box<ApiError>>,
}

impl ApiError {
    fn new(kind: ErrorKind, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
            error_code: None,
            error_type: None,
            details: None,
            cause: None,
        }
    }

    /// 4xx response.
    pub fn client(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, status_code, message)
    }

    /// 5xx response.
    pub fn server(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, status_code, message)
    }

    /// Transport failure without a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, NETWORK_ERROR_STATUS, message)
            .with_code("NETWORK_ERROR")
    }

    /// Per-attempt timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, TIMEOUT_STATUS, message).with_code("TIMEOUT")
    }

    /// Credential resolution failure.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Credentials, 401, message).with_code("CREDENTIALS_UNAVAILABLE")
    }

    /// Terminal error wrapping the last retryable failure.
    pub fn max_retries_exceeded(attempts: u32, last_error: ApiError) -> Self {
        let mut err = Self::new(
            ErrorKind::MaxRetriesExceeded,
            last_error.status_code,
            format!(
                "Request failed after {} attempts: {}",
                attempts, last_error.message
            ),
        )
        .with_code(MAX_RETRIES_EXCEEDED);
        err.error_type = last_error.error_type.clone();
        err.details = last_error.details.clone();
        err.cause = Some(Box::new(last_error));
        err
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_max_retries_exceeded(&self) -> bool {
        self.kind == ErrorKind::MaxRetriesExceeded
    }

    /// The wrapped last error, if this is a `MaxRetriesExceeded`.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.cause.as_deref()
    }
}

impl IntoResponse for ApiError {
    /// Upstream statuses outside 4xx/5xx (a stray 3xx, say) become 502; the
    /// body keeps the original `statusCode`.
    fn into_response(self) -> Response {
        let status = match StatusCode::from_u16(self.status_code) {
            Ok(status) if status.is_client_error() || status.is_server_error() => status,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self)).into_response()
    }
}
