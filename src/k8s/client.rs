//! Kubernetes client wrapper
//!
//! Resolves cluster credentials the way the gateways are deployed: in-cluster
//! service account first, then `KUBECONFIG`, then `~/.kube/config`.

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{get_env, EnvSource, ProcessEnv};

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Connect using in-cluster credentials or a local kubeconfig
    pub async fn connect() -> Result<Self> {
        let config = match Config::incluster() {
            Ok(config) => {
                info!("Using in-cluster service account credentials");
                config
            }
            Err(e) => {
                debug!("In-cluster config unavailable: {}", e);
                let path = kubeconfig_path(&ProcessEnv).context("no kubeconfig found")?;
                info!("Using kubeconfig {}", path.display());
                Self::load_kubeconfig(path).await?
            }
        };

        Self::with_config(config)
    }

    /// Create client with custom config
    pub fn with_config(config: Config) -> Result<Self> {
        let client =
            Client::try_from(config).context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    async fn load_kubeconfig(path: PathBuf) -> Result<Config> {
        let kubeconfig = Kubeconfig::read_from(&path)
            .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;

        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("Failed to build kubeconfig")
    }

    /// Get the underlying kube client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Kubeconfig location: `KUBECONFIG` if set, else `~/.kube/config`
pub fn kubeconfig_path(source: &impl EnvSource) -> Option<PathBuf> {
    get_env(source, "KUBECONFIG")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
}
