//! Error classification: retryable vs. fatal outcomes.
//!
//! This is the only place that interprets status codes.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ApiError;

/// Result of looking at one attempt's response.
#[derive(Debug, Clone)]
pub enum Classification {
    /// 2xx, stop and return the response.
    Success,
    /// 5xx, timeout or network failure; another attempt may follow.
    Retryable(ApiError),
    /// 4xx or an unexpected status; stop immediately.
    Fatal(ApiError),
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    // == Classify Status ==
    pub fn classify_status(status: u16, body: &Value) -> Classification {
        match status {
            200..=299 => Classification::Success,
            400..=499 => Classification::Fatal(Self::error_from_body(
                ApiError::client(status, default_message(status)),
                body,
            )),
            500..=599 => Classification::Retryable(Self::error_from_body(
                ApiError::server(status, default_message(status)),
                body,
            )),
            _ => Classification::Fatal(Self::error_from_body(
                ApiError::client(status, format!("Unexpected status {}", status)),
                body,
            )),
        }
    }

    // == Classify Transport ==
    /// Maps a failure that produced no usable response. Always retryable.
    pub fn classify_transport(err: &reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::timeout(format!("Request timed out: {}", err))
        } else {
            ApiError::network(format!("Network error: {}", err))
        }
    }

    /// Fills message/code/type/details from an error body.
    ///
    /// Understands a nested `{"error": {"message", "code", "type"}}` object as
    /// well as flat `message`/`code`/`type` or `error_message`/`error_code`
    /// fields. Unknown bodies are attached as `details` unchanged.
    pub fn error_from_body(mut error: ApiError, body: &Value) -> ApiError {
        if body.is_null() {
            return error;
        }

        let source = match body.get("error") {
            Some(inner) if inner.is_object() => inner,
            _ => body,
        };

        if let Some(message) = string_field(source, &["message", "error_message"]) {
            error.message = message;
        } else if let Some(text) = body.as_str().filter(|t| !t.is_empty()) {
            error.message = text.to_string();
        }
        if let Some(code) = string_field(source, &["code", "error_code"]) {
            error.error_code = Some(code);
        }
        if let Some(error_type) = string_field(source, &["type", "error_type"]) {
            error.error_type = Some(error_type);
        }
        error.details = Some(body.clone());
        error
    }
}

fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

fn default_message(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("HTTP {}: {}", status, reason),
        None => format!("HTTP {}", status),
    }
}
