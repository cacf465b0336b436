//! Request description and per-attempt request building.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Method;
use serde_json::Value;

use crate::executor::Credentials;

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!("resilient-cache/", env!("CARGO_PKG_VERSION"));

// == Api Request ==
/// Description of a call to the remote API, reusable across attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the upstream base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Cache key for this request: `METHOD:/path?query`.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}:{}", self.method, self.path);
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            key.push('?');
            key.push_str(&query.join("&"));
        }
        key
    }
}

// == Request Builder ==
/// Turns an `ApiRequest` plus freshly resolved credentials into a reqwest
/// request for a single attempt.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn url(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path)
    }

    /// Builds one attempt. The timeout applies to this attempt only.
    pub fn build(&self, request: &ApiRequest, credentials: &Credentials) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(request))
            .timeout(self.timeout)
            .header(ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = credentials.apply(builder);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}
