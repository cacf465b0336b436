//! Retry loop around single HTTP attempts.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{RetryConfig, UpstreamConfig};
use crate::error::{ApiError, CacheError, Result};
use crate::executor::{
    ApiRequest, BackoffCalculator, Classification, CredentialProvider, ErrorClassifier,
    RequestBuilder,
};

// == Api Response ==
/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when empty, a JSON string when not JSON
    pub body: Value,
}

impl ApiResponse {
    /// Deserializes the body into a typed object.
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            ApiError::client(self.status, format!("Failed to decode response body: {}", e))
                .with_code("INVALID_RESPONSE")
        })
    }
}

/// State of one retry loop invocation. Never leaves the executor.
#[derive(Debug)]
struct RequestAttempt {
    number: u32,
    started_at: Instant,
    last_error: Option<ApiError>,
}

impl RequestAttempt {
    fn first() -> Self {
        Self {
            number: 1,
            started_at: Instant::now(),
            last_error: None,
        }
    }
}

// == Request Executor ==
/// Executes API requests with per-attempt credentials, per-attempt timeouts
/// and exponential backoff between retryable failures.
///
/// Delivery is at-least-once: a request whose response was lost may have
/// been applied upstream, so non-idempotent calls need caller-side
/// idempotency keys.
#[derive(Clone)]
pub struct RequestExecutor {
    builder: RequestBuilder,
    retry: RetryConfig,
    backoff: BackoffCalculator,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("builder", &self.builder)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    // == Constructor ==
    pub fn new(
        upstream: &UpstreamConfig,
        retry: RetryConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        upstream.validate()?;
        retry.validate()?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            builder: RequestBuilder::new(client, &upstream.base_url, upstream.timeout()),
            backoff: BackoffCalculator::new(&retry),
            retry,
            credentials,
        })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    // == Execute ==
    /// Runs the request until it succeeds, fails fatally, or the attempt
    /// budget is spent.
    ///
    /// A 4xx ends the loop at once with a `Client` error. Exhausting the
    /// budget on retryable failures yields `MaxRetriesExceeded` wrapping the
    /// last failure.
    pub async fn execute(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, ApiError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = RequestAttempt::first();

        loop {
            attempt.started_at = Instant::now();

            let err = match self.attempt_once(request).await {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        status = response.status,
                        attempt = attempt.number,
                        elapsed_ms = attempt.started_at.elapsed().as_millis() as u64,
                        "request succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    status = err.status_code,
                    attempt = attempt.number,
                    error = %err,
                    "request failed with non-retryable error"
                );
                return Err(err);
            }

            if attempt.number >= max_attempts {
                attempt.last_error = Some(err);
                break;
            }

            let delay = self.backoff.delay(attempt.number);
            warn!(
                method = %request.method,
                path = %request.path,
                status = err.status_code,
                attempt = attempt.number,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            attempt.last_error = Some(err);

            tokio::time::sleep(delay).await;
            attempt.number += 1;
        }

        let last_error = attempt
            .last_error
            .unwrap_or_else(|| ApiError::network("no attempt completed"));
        error!(
            method = %request.method,
            path = %request.path,
            status = last_error.status_code,
            max_attempts,
            error = %last_error,
            "request failed, retries exhausted"
        );
        Err(ApiError::max_retries_exceeded(max_attempts, last_error))
    }

    /// Executes and deserializes the response body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> std::result::Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    async fn attempt_once(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, ApiError> {
        let credentials = self.credentials.credentials().await?;

        let response = self
            .builder
            .build(request, &credentials)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e))?;
        let body = parse_body(&bytes);

        match ErrorClassifier::classify_status(status, &body) {
            Classification::Success => Ok(ApiResponse { status, body }),
            Classification::Retryable(err) | Classification::Fatal(err) => Err(err),
        }
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StaticCredentials;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"id":"pay_1"}"#), json!({"id": "pay_1"}));
        assert_eq!(parse_body(b"bad gateway"), json!("bad gateway"));
    }

    #[test]
    fn test_response_json() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Payment {
            payment_id: String,
            amount: u64,
        }

        let response = ApiResponse {
            status: 200,
            body: json!({"payment_id": "pay_1", "amount": 500}),
        };
        let payment: Payment = response.json().unwrap();
        assert_eq!(payment.amount, 500);

        let bad = ApiResponse {
            status: 200,
            body: json!("nope"),
        };
        let err = bad.json::<Payment>().unwrap_err();
        assert_eq!(err.error_code.as_deref(), Some("INVALID_RESPONSE"));
    }

    #[test]
    fn test_executor_rejects_invalid_config() {
        let retry = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        let result = RequestExecutor::new(
            &UpstreamConfig::default(),
            retry,
            Arc::new(StaticCredentials::anonymous()),
        );
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }
}
