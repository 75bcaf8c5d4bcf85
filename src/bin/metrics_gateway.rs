//! Metrics gateway
//!
//! Relays PromQL instant queries to Prometheus for browser clients.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use sockshop_tools::config::MetricsGatewayConfig;
use sockshop_tools::http::PrometheusClient;
use sockshop_tools::server::{self, metrics::BuildInfo, CorsPolicy};
use sockshop_tools::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match MetricsGatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logger(LogLevel::Info);
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logger(config.log_level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: MetricsGatewayConfig) -> Result<()> {
    let build = BuildInfo::current();
    info!(
        "Starting SockShop Prometheus Tool v{} (built: {})",
        build.version, build.build_time
    );
    info!("Prometheus URL: {}", config.prometheus_url);
    info!("CORS allowed origin: {}", config.allowed_origin);

    let backend = PrometheusClient::new(&config.prometheus_url)?;
    let cors_policy = CorsPolicy::metrics_gateway(&config.allowed_origin)?;
    let app = server::metrics::router(Arc::new(backend), build, cors_policy);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    server::serve(listener, app).await
}
