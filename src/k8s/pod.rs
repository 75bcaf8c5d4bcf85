//! Pod log access
//!
//! [`PodLogSource`] is the capability the log gateway holds; [`PodLogs`] backs
//! it with the cluster API.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{AsyncBufReadExt, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, LogParams};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::K8sClient;

/// Upper bound for the pod existence check
pub const POD_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw log bytes as they arrive from the cluster
pub type LogStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// Pod log errors
#[derive(Error, Debug)]
pub enum LogSourceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Options for a single log request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogOptions {
    pub container: Option<String>,
    pub tail_lines: i64,
    pub follow: bool,
}

impl LogOptions {
    pub fn to_log_params(&self) -> LogParams {
        LogParams {
            container: self.container.clone(),
            tail_lines: Some(self.tail_lines),
            follow: self.follow,
            ..Default::default()
        }
    }
}

/// Source of pod logs
#[async_trait]
pub trait PodLogSource: Send + Sync {
    /// Whether the pod exists in the namespace
    async fn pod_exists(&self, namespace: &str, pod: &str) -> Result<bool, LogSourceError>;

    /// Open a log stream for the pod
    async fn stream_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<LogStream, LogSourceError>;
}

/// Pod logs from the Kubernetes API
#[derive(Clone)]
pub struct PodLogs {
    client: K8sClient,
}

impl PodLogs {
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.client().clone(), namespace)
    }
}

#[async_trait]
impl PodLogSource for PodLogs {
    async fn pod_exists(&self, namespace: &str, pod: &str) -> Result<bool, LogSourceError> {
        let api = self.api(namespace);
        let found = tokio::time::timeout(POD_CHECK_TIMEOUT, api.get_opt(pod))
            .await
            .map_err(|_| LogSourceError::Timeout(POD_CHECK_TIMEOUT))??;

        Ok(found.is_some())
    }

    async fn stream_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<LogStream, LogSourceError> {
        debug!("Opening log stream for {}/{}: {:?}", namespace, pod, options);

        let reader = self
            .api(namespace)
            .log_stream(pod, &options.to_log_params())
            .await?;

        let stream = futures::stream::try_unfold(Box::pin(reader), |mut reader| async move {
            let chunk = reader.fill_buf().await?.to_vec();
            if chunk.is_empty() {
                return Ok(None);
            }
            reader.consume_unpin(chunk.len());
            Ok::<_, io::Error>(Some((chunk, reader)))
        });

        Ok(stream.boxed())
    }
}
