//! Log gateway
//!
//! Serves pod logs from the cluster it runs in over plain HTTP.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use sockshop_tools::config::LogGatewayConfig;
use sockshop_tools::k8s::{K8sClient, PodLogs};
use sockshop_tools::server;
use sockshop_tools::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match LogGatewayConfig::load() {
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

async fn run(config: LogGatewayConfig) -> Result<()> {
    let client = K8sClient::connect()
        .await
        .context("Failed to create Kubernetes client")?;
    let app = server::logs::router(Arc::new(PodLogs::new(client)));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Log gateway listening on port {}", config.port);
    server::serve(listener, app).await
}
