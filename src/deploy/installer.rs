//! Chart installation
//!
//! Validates the chart folder, runs `helm upgrade --install` (or `helm
//! install`) and then waits for every Deployment in the namespace with
//! `kubectl rollout status`.
//!
//! Helm's own `--wait` is never used: its readiness poller in helm 3.14 fails
//! with client rate limiter deadline errors, so readiness is checked here.

use anyhow::{Context, Result};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use super::chart::CHART_MANIFEST;
use super::command::{CommandLine, CommandOutput, CommandRunner, OutputMode};

const HELM: &str = "helm";
const KUBECTL: &str = "kubectl";

/// Rollout timeout used when none is configured
pub const DEFAULT_TIMEOUT: &str = "10m";

/// Chart configuration errors, detected before any command runs
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("folder name is required. Use --folder flag")]
    MissingFolder,

    #[error("chart folder not found: {}", .0.display())]
    ChartNotFound(PathBuf),

    #[error("not a valid Helm chart - Chart.yaml not found in: {}", .0.display())]
    NotAChart(PathBuf),

    #[error("values file not found: {}", .0.display())]
    ValuesNotFound(PathBuf),
}

/// Installer configuration
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Chart folder under `charts_path`
    pub folder: String,

    /// Helm release name
    pub release: String,

    /// Target namespace
    pub namespace: String,

    /// Base directory holding the charts
    pub charts_path: PathBuf,

    /// Custom values file passed with `-f`
    pub values_file: Option<PathBuf>,

    /// Comma-separated `key=value` overrides
    pub set_values: Option<String>,

    pub dry_run: bool,

    /// Wait for Deployments to roll out after helm returns
    pub wait: bool,

    /// Helm and rollout timeout, e.g. "10m"
    pub timeout: String,

    /// Pre-create and label the namespace for helm
    pub create_namespace: bool,

    /// `helm upgrade --install` instead of `helm install`
    pub upgrade: bool,

    pub kubeconfig: Option<String>,
    pub kube_context: Option<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            folder: String::new(),
            release: String::new(),
            namespace: "default".to_string(),
            charts_path: PathBuf::from("/charts"),
            values_file: None,
            set_values: None,
            dry_run: false,
            wait: true,
            timeout: DEFAULT_TIMEOUT.to_string(),
            create_namespace: true,
            upgrade: true,
            kubeconfig: None,
            kube_context: None,
        }
    }
}

impl InstallConfig {
    /// Configuration for `folder`, released under the same name
    pub fn new(folder: impl Into<String>) -> Self {
        let folder = folder.into();
        Self {
            release: folder.clone(),
            folder,
            ..Default::default()
        }
    }

    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    pub fn charts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.charts_path = path.into();
        self
    }

    pub fn values_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.values_file = Some(path.into());
        self
    }

    pub fn set_values(mut self, values: impl Into<String>) -> Self {
        self.set_values = Some(values.into());
        self
    }

    /// Full path of the chart directory
    pub fn chart_path(&self) -> PathBuf {
        self.charts_path.join(&self.folder)
    }

    /// Check the chart folder and values file
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.folder.is_empty() {
            return Err(ValidationError::MissingFolder);
        }

        let chart_path = self.chart_path();
        if !chart_path.exists() {
            return Err(ValidationError::ChartNotFound(chart_path));
        }

        if !chart_path.join(CHART_MANIFEST).exists() {
            return Err(ValidationError::NotAChart(chart_path));
        }

        if let Some(values) = &self.values_file {
            if !values.exists() {
                return Err(ValidationError::ValuesNotFound(values.clone()));
            }
        }

        Ok(())
    }

    /// `--set` overrides, one per comma-separated item
    pub fn overrides(&self) -> Vec<String> {
        self.set_values
            .as_deref()
            .map(|values| {
                values
                    .split(',')
                    .map(str::trim)
                    .filter(|kv| !kv.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Arguments of the helm invocation
    pub fn helm_args(&self) -> Vec<String> {
        let mut args = if self.upgrade {
            vec!["upgrade".to_string(), "--install".to_string()]
        } else {
            vec!["install".to_string()]
        };

        args.push(self.release.clone());
        args.push(self.chart_path().to_string_lossy().to_string());
        args.push("--namespace".to_string());
        args.push(self.namespace.clone());

        if let Some(values) = &self.values_file {
            args.push("-f".to_string());
            args.push(values.to_string_lossy().to_string());
        }

        for kv in self.overrides() {
            args.push("--set".to_string());
            args.push(kv);
        }

        if self.dry_run {
            args.push("--dry-run".to_string());
        }

        if !self.timeout.is_empty() {
            args.push("--timeout".to_string());
            args.push(self.timeout.clone());
        }

        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.clone());
        }

        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }

        args
    }

    /// `kubectl` arguments with the configured kubeconfig and context appended
    pub fn kubectl_args<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();

        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.clone());
        }

        if let Some(context) = &self.kube_context {
            args.push("--context".to_string());
            args.push(context.clone());
        }

        args
    }

    fn rollout_timeout(&self) -> &str {
        if self.timeout.is_empty() {
            DEFAULT_TIMEOUT
        } else {
            &self.timeout
        }
    }
}

/// Chart installer
pub struct ChartInstaller<R> {
    config: InstallConfig,
    runner: R,
}

impl<R: CommandRunner> ChartInstaller<R> {
    /// Create a new chart installer
    pub fn new(config: InstallConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Validate, then install
    pub async fn run(&self) -> Result<()> {
        self.config.validate().context("Configuration error")?;
        self.install().await.context("Installation failed")
    }

    /// Install the chart and wait for its Deployments
    pub async fn install(&self) -> Result<()> {
        if self.config.create_namespace {
            if let Err(e) = self.ensure_namespace().await {
                warn!(
                    "Failed to ensure namespace {}: {:#}",
                    self.config.namespace, e
                );
            }
        }

        let args = self.config.helm_args();
        info!("Executing: {}", CommandLine { program: HELM, args: &args });
        self.run_checked(HELM, &args, OutputMode::Inherit).await?;

        if !self.config.wait {
            return Ok(());
        }

        if self.config.dry_run {
            info!("Dry run, skipping wait for deployments");
            return Ok(());
        }

        self.wait_for_deployments()
            .await
            .context("deployments not ready")
    }

    /// Create the namespace if missing and label it so helm adopts it.
    ///
    /// Helm's `--create-namespace` fails on `upgrade --install` when the
    /// namespace was created outside of helm, so it is prepared here instead.
    pub async fn ensure_namespace(&self) -> Result<()> {
        let namespace = &self.config.namespace;

        let exists = self
            .runner
            .run(
                KUBECTL,
                &self.config.kubectl_args(["get", "namespace", namespace.as_str()]),
                OutputMode::Capture,
            )
            .await
            .with_context(|| format!("Failed to run {KUBECTL}"))?
            .success;

        if exists {
            info!("Namespace {} already exists", namespace);
        } else {
            info!("Creating namespace: {}", namespace);
            self.run_checked(
                KUBECTL,
                &self.config.kubectl_args(["create", "namespace", namespace.as_str()]),
                OutputMode::Inherit,
            )
            .await
            .context("failed to create namespace")?;
        }

        info!("Labeling namespace {} for Helm ownership", namespace);
        self.run_checked(
            KUBECTL,
            &self.config.kubectl_args([
                "label",
                "namespace",
                namespace.as_str(),
                "app.kubernetes.io/managed-by=Helm",
                "--overwrite",
            ]),
            OutputMode::Inherit,
        )
        .await
        .context("failed to label namespace")?;

        let release_annotation = format!("meta.helm.sh/release-name={}", self.config.release);
        let namespace_annotation = format!("meta.helm.sh/release-namespace={namespace}");
        self.run_checked(
            KUBECTL,
            &self.config.kubectl_args([
                "annotate",
                "namespace",
                namespace.as_str(),
                release_annotation.as_str(),
                namespace_annotation.as_str(),
                "--overwrite",
            ]),
            OutputMode::Inherit,
        )
        .await
        .context("failed to annotate namespace")?;

        Ok(())
    }

    /// Names of the Deployments in the target namespace
    pub async fn list_deployments(&self) -> Result<Vec<String>> {
        let output = self
            .run_checked(
                KUBECTL,
                &self.config.kubectl_args([
                    "get",
                    "deployments",
                    "-n",
                    self.config.namespace.as_str(),
                    "-o",
                    "jsonpath={.items[*].metadata.name}",
                ]),
                OutputMode::Capture,
            )
            .await
            .context("failed to list deployments")?;

        Ok(output
            .stdout
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    /// Wait for each Deployment in turn; the first failure stops the wait
    pub async fn wait_for_deployments(&self) -> Result<()> {
        let namespace = &self.config.namespace;
        let timeout = self.config.rollout_timeout();

        info!(
            "Waiting for all deployments in namespace {} to be ready (timeout: {})...",
            namespace, timeout
        );

        let deployments = self.list_deployments().await?;
        if deployments.is_empty() {
            info!("No deployments found in namespace {}, skipping wait", namespace);
            return Ok(());
        }

        info!(
            "Found {} deployments: {}",
            deployments.len(),
            deployments.join(", ")
        );

        for deployment in &deployments {
            info!("Waiting for deployment {}...", deployment);

            let target = format!("deployment/{deployment}");
            let timeout_arg = format!("--timeout={timeout}");
            self.run_checked(
                KUBECTL,
                &self.config.kubectl_args([
                    "rollout",
                    "status",
                    target.as_str(),
                    "-n",
                    namespace.as_str(),
                    timeout_arg.as_str(),
                ]),
                OutputMode::Inherit,
            )
            .await
            .with_context(|| format!("deployment {deployment} not ready"))?;

            info!("Deployment {} is ready", deployment);
        }

        info!("All deployments in namespace {} are ready", namespace);
        Ok(())
    }

    async fn run_checked(
        &self,
        program: &str,
        args: &[String],
        mode: OutputMode,
    ) -> Result<CommandOutput> {
        let output = self
            .runner
            .run(program, args, mode)
            .await
            .with_context(|| format!("Failed to run {program}"))?;

        if !output.success {
            let stderr = output.stderr.trim();
            if stderr.is_empty() {
                anyhow::bail!("{program} failed: {}", output.status());
            }
            anyhow::bail!("{program} failed: {}: {stderr}", output.status());
        }

        Ok(output)
    }
}
