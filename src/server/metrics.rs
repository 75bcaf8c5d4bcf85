//! Metrics gateway
//!
//! Relays instant PromQL queries to Prometheus and returns its JSON verbatim.

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tracing::{error, info};

use super::{cors, docs, first_param, request_trace, CorsPolicy, QueryPairs};
use crate::http::{BackendError, BackendHealth, InstantQuery, MetricsBackend};

const SERVICE_NAME: &str = "sockshop-prometheus-tool";

/// Version and build time shown by `/` and `/health`
#[derive(Clone, Copy, Debug)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_time: &'static str,
}

impl BuildInfo {
    /// Crate version and the `BUILD_TIME` captured at compile time
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
        }
    }
}

/// Metrics gateway errors, rendered as JSON
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("query parameter is required. Example: /query?query=up")]
    MissingQuery,

    #[error("Prometheus query failed")]
    Backend(#[source] BackendError),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("not found")]
    NotFound,
}

impl MetricsError {
    pub fn status(&self) -> StatusCode {
        match self {
            MetricsError::MissingQuery => StatusCode::BAD_REQUEST,
            MetricsError::Backend(_) => StatusCode::BAD_GATEWAY,
            MetricsError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            MetricsError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
    code: u16,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            status: "error",
            error: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

/// Raw `/query` query string
#[derive(Debug, Default)]
pub struct QueryParams {
    pub query: Option<String>,
    pub time: Option<String>,
}

impl From<QueryPairs> for QueryParams {
    fn from(pairs: QueryPairs) -> Self {
        Self {
            query: first_param(&pairs, "query"),
            time: first_param(&pairs, "time"),
        }
    }
}

impl TryFrom<QueryParams> for InstantQuery {
    type Error = MetricsError;

    fn try_from(params: QueryParams) -> Result<Self, Self::Error> {
        let query = params
            .query
            .filter(|q| !q.is_empty())
            .ok_or(MetricsError::MissingQuery)?;

        Ok(InstantQuery {
            query,
            time: params.time.filter(|t| !t.is_empty()),
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    prometheus_status: BackendHealth,
    timestamp: String,
}

#[derive(Clone)]
struct MetricsState {
    backend: Arc<dyn MetricsBackend>,
    build: BuildInfo,
}

/// Build the metrics gateway router
pub fn router(backend: Arc<dyn MetricsBackend>, build: BuildInfo, cors_policy: CorsPolicy) -> Router {
    Router::new()
        .route("/", get(root).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/query", get(query).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(MetricsState { backend, build })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(cors_policy, cors))
                .layer(request_trace()),
        )
}

async fn root(State(state): State<MetricsState>) -> Html<String> {
    docs::metrics_gateway_page(state.build.version, state.build.build_time)
}

async fn method_not_allowed() -> MetricsError {
    MetricsError::MethodNotAllowed
}

async fn not_found() -> MetricsError {
    MetricsError::NotFound
}

async fn health(State(state): State<MetricsState>) -> Json<HealthResponse> {
    let prometheus_status = state.backend.health().await;

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: state.build.version,
        prometheus_status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

async fn query(
    State(state): State<MetricsState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Response, MetricsError> {
    let query = InstantQuery::try_from(QueryParams::from(pairs))?;
    info!("Querying Prometheus: query={}", query.query);

    let body = state.backend.query(&query).await.map_err(|e| {
        error!("Prometheus query failed: {}", e);
        MetricsError::Backend(e)
    })?;

    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}
