//! HTTP client module for the metrics backend
//!
//! Provides the Prometheus client used by the metrics gateway.

mod client;

pub use client::{
    BackendError, BackendHealth, InstantQuery, MetricsBackend, PrometheusClient, HEALTH_TIMEOUT,
    MAX_RESPONSE_SIZE, QUERY_TIMEOUT,
};
