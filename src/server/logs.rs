//! Log gateway
//!
//! `GET /logs` checks that the pod exists, then relays its container log.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{CONTENT_TYPE, TRANSFER_ENCODING},
        StatusCode,
    },
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tracing::{error, info, warn};

use super::{cors, docs, first_param, request_trace, CorsPolicy, QueryPairs};
use crate::k8s::{LogOptions, LogSourceError, PodLogSource};

/// Tail length used when `lines` is missing or invalid
pub const DEFAULT_TAIL_LINES: i64 = 100;

const SERVICE_NAME: &str = "sockshop-log-tool";

/// Log gateway errors, rendered as plain text
#[derive(Error, Debug)]
pub enum LogsError {
    #[error("namespace and pod parameters are required")]
    MissingParameters,

    #[error("Pod '{pod}' not found in namespace '{namespace}'")]
    PodNotFound { namespace: String, pod: String },

    #[error("Failed to connect to Kubernetes cluster")]
    Cluster(#[source] LogSourceError),

    #[error("Failed to fetch logs: {0}")]
    Fetch(#[source] LogSourceError),

    #[error("Failed to read logs: {0}")]
    Read(#[source] std::io::Error),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl LogsError {
    pub fn status(&self) -> StatusCode {
        match self {
            LogsError::MissingParameters => StatusCode::BAD_REQUEST,
            LogsError::PodNotFound { .. } => StatusCode::NOT_FOUND,
            LogsError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            LogsError::Cluster(_) | LogsError::Fetch(_) | LogsError::Read(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LogsError {
    fn into_response(self) -> Response {
        (self.status(), format!("{self}\n")).into_response()
    }
}

/// Raw `/logs` query string
#[derive(Debug, Default)]
pub struct LogsQuery {
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub lines: Option<String>,
    pub follow: Option<String>,
}

impl From<QueryPairs> for LogsQuery {
    fn from(pairs: QueryPairs) -> Self {
        Self {
            namespace: first_param(&pairs, "namespace"),
            pod: first_param(&pairs, "pod"),
            container: first_param(&pairs, "container"),
            lines: first_param(&pairs, "lines"),
            follow: first_param(&pairs, "follow"),
        }
    }
}

/// Validated log request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod: String,
    pub options: LogOptions,
}

impl TryFrom<LogsQuery> for LogRequest {
    type Error = LogsError;

    fn try_from(query: LogsQuery) -> Result<Self, Self::Error> {
        let namespace = non_empty(query.namespace).ok_or(LogsError::MissingParameters)?;
        let pod = non_empty(query.pod).ok_or(LogsError::MissingParameters)?;

        Ok(Self {
            namespace,
            pod,
            options: LogOptions {
                container: non_empty(query.container),
                tail_lines: parse_lines(query.lines.as_deref()),
                follow: query.follow.as_deref() == Some("true"),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Positive line count, else [`DEFAULT_TAIL_LINES`]
pub fn parse_lines(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_TAIL_LINES)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

#[derive(Clone)]
struct LogsState {
    source: Arc<dyn PodLogSource>,
}

/// Build the log gateway router
pub fn router(source: Arc<dyn PodLogSource>) -> Router {
    Router::new()
        .route("/", get(docs::log_gateway_page))
        .route("/health", get(health))
        .route("/logs", get(get_logs).fallback(method_not_allowed))
        .with_state(LogsState { source })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(CorsPolicy::log_gateway(), cors))
                .layer(request_trace()),
        )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

async fn method_not_allowed() -> LogsError {
    LogsError::MethodNotAllowed
}

async fn get_logs(
    State(state): State<LogsState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Response, LogsError> {
    let LogRequest {
        namespace,
        pod,
        options,
    } = LogRequest::try_from(LogsQuery::from(pairs))?;

    let exists = state
        .source
        .pod_exists(&namespace, &pod)
        .await
        .map_err(|e| {
            error!("Failed to look up pod {}/{}: {}", namespace, pod, e);
            LogsError::Cluster(e)
        })?;

    if !exists {
        warn!("Pod {} not found in namespace {}", pod, namespace);
        return Err(LogsError::PodNotFound { namespace, pod });
    }

    let stream = state
        .source
        .stream_logs(&namespace, &pod, &options)
        .await
        .map_err(|e| {
            error!("Failed to get logs for pod {}/{}: {}", namespace, pod, e);
            LogsError::Fetch(e)
        })?;

    info!(
        "Streaming logs for {}/{} (lines={}, follow={})",
        namespace, pod, options.tail_lines, options.follow
    );

    if options.follow {
        let stream = stream.inspect_err(move |e| {
            error!("Error streaming logs for {}/{}: {}", namespace, pod, e);
        });

        return Ok((
            [
                (CONTENT_TYPE, "text/plain; charset=utf-8"),
                (TRANSFER_ENCODING, "chunked"),
            ],
            Body::from_stream(stream),
        )
            .into_response());
    }

    let body: Vec<u8> = stream.try_concat().await.map_err(|e| {
        error!("Error reading logs for {}/{}: {}", namespace, pod, e);
        LogsError::Read(e)
    })?;

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::LogStream;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{Method, Request};
    use futures::StreamExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    /// In-memory cluster with a fixed set of pods
    #[derive(Default)]
    struct FakeCluster {
        pods: Vec<(&'static str, &'static str)>,
        logs: Vec<&'static str>,
        lookup_fails: bool,
        requests: Mutex<Vec<LogOptions>>,
    }

    #[async_trait]
    impl PodLogSource for FakeCluster {
        async fn pod_exists(&self, namespace: &str, pod: &str) -> Result<bool, LogSourceError> {
            if self.lookup_fails {
                return Err(LogSourceError::Timeout(Duration::from_secs(10)));
            }
            Ok(self.pods.iter().any(|(ns, p)| *ns == namespace && *p == pod))
        }

        async fn stream_logs(
            &self,
            _namespace: &str,
            _pod: &str,
            options: &LogOptions,
        ) -> Result<LogStream, LogSourceError> {
            self.requests.lock().unwrap().push(options.clone());
            let chunks: Vec<std::io::Result<Vec<u8>>> = self
                .logs
                .iter()
                .map(|line| Ok(line.as_bytes().to_vec()))
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    fn cluster() -> Arc<FakeCluster> {
        Arc::new(FakeCluster {
            pods: vec![("sock-shop", "front-end-1")],
            logs: vec!["GET /index.html 200\n", "GET /catalogue 200\n"],
            ..Default::default()
        })
    }

    async fn send(source: Arc<FakeCluster>, method: Method, uri: &str) -> Response {
        router(source)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_lines() {
        assert_eq!(parse_lines(Some("50")), 50);
        assert_eq!(parse_lines(Some("0")), 100);
        assert_eq!(parse_lines(Some("-5")), 100);
        assert_eq!(parse_lines(Some("abc")), 100);
        assert_eq!(parse_lines(Some("")), 100);
        assert_eq!(parse_lines(None), 100);
    }

    #[test]
    fn test_log_request_follow_flag() {
        let request = |follow: Option<&str>| {
            LogRequest::try_from(LogsQuery {
                namespace: Some("sock-shop".to_string()),
                pod: Some("orders-1".to_string()),
                follow: follow.map(str::to_string),
                ..Default::default()
            })
            .unwrap()
        };

        assert!(request(Some("true")).options.follow);
        assert!(!request(Some("TRUE")).options.follow);
        assert!(!request(Some("1")).options.follow);
        assert!(!request(None).options.follow);
    }

    #[test]
    fn test_log_request_requires_namespace_and_pod() {
        let missing_pod = LogsQuery {
            namespace: Some("sock-shop".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LogRequest::try_from(missing_pod),
            Err(LogsError::MissingParameters)
        ));

        let empty_namespace = LogsQuery {
            namespace: Some(String::new()),
            pod: Some("orders-1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LogRequest::try_from(empty_namespace),
            Err(LogsError::MissingParameters)
        ));
    }

    #[tokio::test]
    async fn test_missing_parameters_is_bad_request() {
        for uri in ["/logs", "/logs?namespace=sock-shop", "/logs?pod=front-end-1"] {
            let response = send(cluster(), Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_pod_is_not_found() {
        let response = send(cluster(), Method::GET, "/logs?namespace=sock-shop&pod=carts-9").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_text(response).await;
        assert!(body.contains("carts-9"));
        assert!(body.contains("sock-shop"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_server_error() {
        let source = Arc::new(FakeCluster {
            lookup_fails: true,
            ..Default::default()
        });
        let response = send(source, Method::GET, "/logs?namespace=sock-shop&pod=front-end-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_logs_are_returned_verbatim() {
        let source = cluster();
        let response = send(
            source.clone(),
            Method::GET,
            "/logs?namespace=sock-shop&pod=front-end-1&container=front-end&lines=50",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(response.headers().get(TRANSFER_ENCODING).is_none());
        assert_eq!(
            body_text(response).await,
            "GET /index.html 200\nGET /catalogue 200\n"
        );

        let requests = source.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[LogOptions {
                container: Some("front-end".to_string()),
                tail_lines: 50,
                follow: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_lines_use_default() {
        let source = cluster();
        for lines in ["0", "-5", "many"] {
            let uri = format!("/logs?namespace=sock-shop&pod=front-end-1&lines={lines}");
            let response = send(source.clone(), Method::GET, &uri).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let requests = source.requests.lock().unwrap();
        assert!(requests.iter().all(|options| options.tail_lines == 100));
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_parameter_uses_first_value() {
        let source = cluster();
        let response = send(
            source.clone(),
            Method::GET,
            "/logs?namespace=sock-shop&pod=front-end-1&lines=5&lines=6",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            source.clone(),
            Method::GET,
            "/logs?namespace=sock-shop&namespace=other&pod=front-end-1&lines=&lines=6",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let requests = source.requests.lock().unwrap();
        let tails: Vec<i64> = requests.iter().map(|options| options.tail_lines).collect();
        assert_eq!(tails, vec![5, 100]);
    }

    #[tokio::test]
    async fn test_follow_is_chunked() {
        let response = send(
            cluster(),
            Method::GET,
            "/logs?namespace=sock-shop&pod=front-end-1&follow=true",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[TRANSFER_ENCODING], "chunked");
        assert_eq!(
            body_text(response).await,
            "GET /index.html 200\nGET /catalogue 200\n"
        );

        let response = send(
            cluster(),
            Method::GET,
            "/logs?namespace=sock-shop&pod=front-end-1&follow=yes",
        )
        .await;
        assert!(response.headers().get(TRANSFER_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_post_is_not_allowed() {
        let response = send(cluster(), Method::POST, "/logs?namespace=sock-shop&pod=front-end-1").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_options_short_circuits_with_cors() {
        let response = send(cluster(), Method::OPTIONS, "/logs").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "GET, POST, OPTIONS"
        );
    }

    #[tokio::test]
    async fn test_health_and_docs() {
        let response = send(cluster(), Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "sockshop-log-tool");
        assert!(chrono::DateTime::parse_from_rfc3339(health["timestamp"].as_str().unwrap()).is_ok());

        let response = send(cluster(), Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("GET /logs"));
    }
}
