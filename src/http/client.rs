//! Prometheus HTTP API client
//!
//! Issues instant queries and health probes against a Prometheus server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Client-level timeout for queries
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the backend health probe
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted query response body (10 MiB)
pub const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Prometheus client errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Prometheus returned status {0}")]
    Status(u16),

    #[error("Response body exceeds {0} bytes")]
    TooLarge(usize),
}

/// Instant query parameters, forwarded verbatim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstantQuery {
    pub query: String,
    pub time: Option<String>,
}

impl InstantQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            time: None,
        }
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// Result of probing the backend's own health endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendHealth {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl BackendHealth {
    /// Classify a probe outcome; `None` means no response was received
    pub fn from_status(status: Option<StatusCode>) -> Self {
        match status {
            Some(StatusCode::OK) => BackendHealth::Healthy,
            Some(_) => BackendHealth::Unhealthy,
            None => BackendHealth::Unreachable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendHealth::Healthy => "healthy",
            BackendHealth::Unhealthy => "unhealthy",
            BackendHealth::Unreachable => "unreachable",
        }
    }
}

/// Metrics backend used by the metrics gateway
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Run an instant query and return the raw JSON body
    async fn query(&self, query: &InstantQuery) -> Result<Vec<u8>, BackendError>;

    /// Probe the backend's health endpoint
    async fn health(&self) -> BackendHealth;
}

/// Prometheus client
#[derive(Clone)]
pub struct PrometheusClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
    max_response_size: usize,
}

impl PrometheusClient {
    /// Create a new client for the Prometheus server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: QUERY_TIMEOUT.as_secs(),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the response body limit
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the `/api/v1/query` URL for an instant query
    pub fn query_url(&self, query: &InstantQuery) -> Result<Url, BackendError> {
        let mut params = vec![("query", query.query.as_str())];
        if let Some(time) = &query.time {
            params.push(("time", time.as_str()));
        }

        let url = format!("{}/api/v1/query", self.base_url);
        Url::parse_with_params(&url, &params).map_err(|e| BackendError::InvalidUrl(e.to_string()))
    }

    fn health_url(&self) -> String {
        format!("{}/-/healthy", self.base_url)
    }

    fn map_error(&self, url: &Url, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            BackendError::ConnectionRefused(url.to_string())
        } else {
            BackendError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn query(&self, query: &InstantQuery) -> Result<Vec<u8>, BackendError> {
        let url = self.query_url(query)?;
        debug!("Sending GET request to {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BackendError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_response_size as u64 {
                return Err(BackendError::TooLarge(self.max_response_size));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_error(&url, e))?
        {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(BackendError::TooLarge(self.max_response_size));
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Response: {} ({} bytes)", status.as_u16(), body.len());
        Ok(body)
    }

    async fn health(&self) -> BackendHealth {
        let status = self
            .client
            .get(self.health_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map(|response| response.status())
            .map_err(|e| debug!("Prometheus health probe failed: {}", e))
            .ok();

        BackendHealth::from_status(status)
    }
}
