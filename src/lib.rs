//! SockShop operational tools
//!
//! Three small programs that sit next to the SockShop demo deployment:
//!
//! - `log-gateway`: HTTP gateway over the Kubernetes pod log API
//! - `metrics-gateway`: CORS-enabled relay for Prometheus instant queries
//! - `install-app`: installs a packaged Helm chart and waits for its Deployments
//!
//! ## Usage
//!
//! ```bash
//! # Tail a pod's logs
//! curl 'http://localhost:8080/logs?namespace=sock-shop&pod=carts-0&lines=50'
//!
//! # Query Prometheus
//! curl 'http://localhost:8083/query?query=up'
//!
//! # Install the sock-shop chart
//! install-app --folder sock-shop --namespace sock-shop
//! ```

pub mod cli;
pub mod config;
pub mod deploy;
pub mod http;
pub mod k8s;
pub mod server;
pub mod utils;
