//! Resilient Executor Module
//!
//! Retrying HTTP request execution against the remote payment API.
//!
//! # Data Flow
//! ```text
//! RequestExecutor::execute
//!     → credentials.rs (resolve credentials for this attempt)
//!     → request.rs (build request with per-attempt timeout)
//!     → classify.rs (2xx success, 4xx fatal, 5xx/timeout/network retryable)
//!     → backoff.rs (sleep before the next attempt)
//! ```

mod backoff;
mod classify;
mod credentials;
mod request;
mod retry;

pub use backoff::BackoffCalculator;
pub use classify::{Classification, ErrorClassifier};
pub use credentials::{CredentialProvider, Credentials, StaticCredentials, API_KEY_HEADER};
pub use request::{ApiRequest, RequestBuilder, USER_AGENT};
pub use retry::{ApiResponse, RequestExecutor};
