//! HTTP client trait and implementations.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ScanConfig;
use crate::error::FetchError;

use super::rate_limiter::RateLimiter;

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch the raw body of a successful (2xx) GET.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch a URL and parse its body as JSON.
    async fn fetch_json(&self, url: &str) -> Result<JsonValue, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::InvalidJson(e.to_string()))
    }
}

/// Configuration for ApiClient.
#[derive(Clone)]
pub struct ApiClientBuilder {
    rate_limit_ms: u64,
    timeout: Duration,
    user_agent: String,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ScanConfig::default())
    }

    /// Take timeout, rate limit and user agent from a scan configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            rate_limit_ms: config.rate_limit_ms,
            timeout: config.http_timeout,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Set the rate limit delay in milliseconds. 0 disables rate limiting.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<ApiClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;

        Ok(ApiClient {
            inner,
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
        })
    }
}

/// Production HTTP client for the product catalog APIs.
pub struct ApiClient {
    /// reqwest client, shared connection pool.
    inner: reqwest::Client,
    /// Per-host rate limiter.
    rate_limiter: RateLimiter,
}

impl ApiClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        ApiClientBuilder::new().build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }
}

#[async_trait]
impl HttpClient for ApiClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if let Some(host) = parsed.host_str() {
            self.rate_limiter.wait(host).await;
        }

        tracing::debug!(url, "network: fetching");
        let response = self.inner.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::RequestFailed(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!(url, status = %status, "network: fetched successfully");
        Ok(response.bytes().await?.to_vec())
    }
}

/// Mock response for testing.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Json(JsonValue),
    Bytes(Vec<u8>),
    /// Non-2xx status code.
    Status(u16),
    /// Transport failure.
    Error(String),
    /// Sleep, then answer with the inner response.
    Delayed(Duration, Box<MockResponse>),
}

/// Mock HTTP client for testing.
///
/// Responses are keyed by exact URL. Every request is logged, including ones
/// with no registered response.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn with_json(self, url: &str, json: JsonValue) -> Self {
        self.with_response(url, MockResponse::Json(json))
    }

    pub fn with_bytes(self, url: &str, bytes: Vec<u8>) -> Self {
        self.with_response(url, MockResponse::Bytes(bytes))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// All URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn respond(url: &str, response: &MockResponse) -> Result<Vec<u8>, FetchError> {
        match response {
            MockResponse::Json(json) => serde_json::to_vec(json)
                .map_err(|e| FetchError::InvalidJson(e.to_string())),
            MockResponse::Bytes(bytes) => Ok(bytes.clone()),
            MockResponse::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            MockResponse::Error(e) => Err(FetchError::InvalidUrl(e.clone())),
            MockResponse::Delayed(_, inner) => Self::respond(url, inner),
        }
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let response = match self.responses.get(url) {
            Some(response) => response.clone(),
            None => {
                return Err(FetchError::InvalidUrl(format!(
                    "No mock response for URL: {}",
                    url
                )))
            }
        };

        if let MockResponse::Delayed(delay, _) = &response {
            tokio::time::sleep(*delay).await;
        }

        Self::respond(url, &response)
    }
}
