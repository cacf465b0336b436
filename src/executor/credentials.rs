//! Credential resolution for outbound requests.
//!
//! Credentials are resolved before every attempt, so a provider backed by a
//! rotating secret is picked up mid-retry.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use crate::error::ApiError;

/// Header carrying a merchant API key.
pub const API_KEY_HEADER: &str = "api-key";

/// Authentication attached to a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `api-key: <key>`
    ApiKey(String),
    /// No authentication.
    Anonymous,
}

impl Credentials {
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Self::ApiKey(key) => request.header(API_KEY_HEADER, key),
            Self::Anonymous => request,
        }
    }
}

/// Supplies fresh credentials per attempt.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, ApiError>;
}

/// Provider that always returns the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self(Credentials::ApiKey(key.into()))
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self(Credentials::Bearer(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(Credentials::Anonymous)
    }

    /// API key if one is configured, anonymous otherwise.
    pub fn from_api_key(key: Option<&str>) -> Self {
        match key {
            Some(key) => Self::api_key(key),
            None => Self::anonymous(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, ApiError> {
        Ok(self.0.clone())
    }
}
