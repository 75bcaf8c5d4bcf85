//! Kubernetes API module
//!
//! Client construction and pod log streaming for the log gateway.

mod client;
mod pod;

pub use client::{kubeconfig_path, K8sClient};
pub use pod::{LogOptions, LogSourceError, LogStream, PodLogSource, PodLogs, POD_CHECK_TIMEOUT};
