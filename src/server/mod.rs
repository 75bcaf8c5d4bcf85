//! HTTP gateways
//!
//! Routers for the log and metrics gateways plus the serving loop they share.

mod docs;
pub mod logs;
pub mod metrics;
mod middleware;

pub use middleware::{cors, request_trace, CorsPolicy, RequestTrace};

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info};

/// How long in-flight requests may take to finish after a shutdown signal
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Decoded query string, as key/value pairs in request order
pub type QueryPairs = Vec<(String, String)>;

/// Value of the first `key` in `pairs`; later repeats are ignored
fn first_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.clone())
}

/// Serve `app` until SIGINT/SIGTERM, then drain for at most [`SHUTDOWN_GRACE`]
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    serve_with_shutdown(listener, app, shutdown_signal(), SHUTDOWN_GRACE).await
}

/// Serve `app` until `signal` resolves, then drain for at most `grace`.
///
/// Returns an error if the server fails or the drain deadline elapses.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()>,
    grace: Duration,
) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listen address")?;
    info!("Server starting on {}", addr);

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { trigger.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("Server task failed")?.context("Server error")?;
            return Ok(());
        }
        _ = signal => {}
    }

    info!("Shutting down gracefully...");
    shutdown.notify_one();

    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            result.context("Server task failed")?.context("Server error")?;
            info!("Server stopped");
            Ok(())
        }
        Err(_) => anyhow::bail!(
            "Forced shutdown: requests still in flight after {}s",
            grace.as_secs()
        ),
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
