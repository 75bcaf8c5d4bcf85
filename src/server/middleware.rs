//! Request middleware shared by both gateways

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, X_CONTENT_TYPE_OPTIONS,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Span};

/// CORS headers applied to every response
#[derive(Clone, Debug)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    nosniff: bool,
    preflight_status: StatusCode,
}

impl CorsPolicy {
    /// Policy of the log gateway: any origin, `OPTIONS` answered with 200
    pub fn log_gateway() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_methods: HeaderValue::from_static("GET, POST, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type"),
            nosniff: false,
            preflight_status: StatusCode::OK,
        }
    }

    /// Policy of the metrics gateway: configured origin, `OPTIONS` answered with 204
    pub fn metrics_gateway(origin: &str) -> anyhow::Result<Self> {
        let allow_origin = HeaderValue::from_str(origin)
            .map_err(|_| anyhow::anyhow!("invalid CORS origin: {origin}"))?;

        Ok(Self {
            allow_origin,
            allow_methods: HeaderValue::from_static("GET, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type"),
            nosniff: true,
            preflight_status: StatusCode::NO_CONTENT,
        })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        if self.nosniff {
            headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        }
    }
}

/// Add CORS headers and short-circuit `OPTIONS` requests
pub async fn cors(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        policy.preflight_status.into_response()
    } else {
        next.run(request).await
    };

    policy.apply(response.headers_mut());
    response
}

/// Request tracing layer shared by both gateways
pub type RequestTrace = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request) -> Span,
    (),
    fn(&Response, Duration, &Span),
>;

/// Log method, path, status and duration of every request
pub fn request_trace() -> RequestTrace {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request) -> Span)
        .on_request(())
        .on_response(log_response as fn(&Response, Duration, &Span))
}

fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

fn log_response(response: &Response, latency: Duration, span: &Span) {
    info!(
        parent: span,
        "{} {}ms",
        response.status().as_u16(),
        latency.as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_request_trace_passes_response_through() {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(request_trace());

        for (uri, expected) in [("/health", StatusCode::OK), ("/missing", StatusCode::NOT_FOUND)] {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_metrics_policy_rejects_invalid_origin() {
        assert!(CorsPolicy::metrics_gateway("https://shop.example.com").is_ok());
        assert!(CorsPolicy::metrics_gateway("bad\norigin").is_err());
    }

    #[test]
    fn test_apply_headers() {
        let mut headers = HeaderMap::new();
        CorsPolicy::log_gateway().apply(&mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert!(headers.get(X_CONTENT_TYPE_OPTIONS).is_none());

        let mut headers = HeaderMap::new();
        CorsPolicy::metrics_gateway("https://shop.example.com")
            .unwrap()
            .apply(&mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://shop.example.com");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
