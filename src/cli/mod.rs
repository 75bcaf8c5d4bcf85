//! CLI argument parsing
//!
//! Defines the `install-app` command line using clap.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::deploy::InstallConfig;

const EXAMPLES: &str = "\
Examples:
  # Install sock-shop chart into sock-shop namespace
  install-app --folder sock-shop --namespace sock-shop

  # Install with custom values file
  install-app --folder sock-shop --values /custom/values.yaml

  # Upgrade existing release
  install-app --folder sock-shop --upgrade --namespace sock-shop

  # Dry-run installation
  install-app --folder sock-shop --dry-run

  # Show the charts that can be installed
  install-app --list";

/// Install Helm charts from the packaged chart repository
#[derive(Parser, Debug)]
#[command(name = "install-app")]
#[command(version)]
#[command(about = "A tool to install Helm charts from the packaged repository")]
#[command(after_help = EXAMPLES)]
pub struct InstallArgs {
    /// Name of the folder containing Helm chart (required)
    #[arg(long)]
    pub folder: Option<String>,

    /// Helm release name (defaults to folder name)
    #[arg(long)]
    pub release: Option<String>,

    /// Kubernetes namespace to install into
    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// Base path where charts are located
    #[arg(long, default_value = "/charts")]
    pub charts_path: PathBuf,

    /// Path to custom values file
    #[arg(long)]
    pub values: Option<PathBuf>,

    /// Set values on command line (key=value,key2=value2)
    #[arg(long)]
    pub set: Option<String>,

    /// Simulate installation without applying
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = false)]
    pub dry_run: bool,

    /// Wait for resources to be ready
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = true)]
    pub wait: bool,

    /// Timeout for installation
    #[arg(long, default_value = "10m")]
    pub timeout: String,

    /// Create namespace if it doesn't exist
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = true)]
    pub create_namespace: bool,

    /// Use helm upgrade --install for idempotent installs (set to false to use helm install)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", default_value_t = true)]
    pub upgrade: bool,

    /// Path to kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use
    #[arg(long)]
    pub context: Option<String>,

    /// List the charts under --charts-path and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl InstallArgs {
    /// Installer configuration; the release name defaults to the folder name
    pub fn into_config(self) -> InstallConfig {
        let folder = self.folder.unwrap_or_default();
        let release = self
            .release
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| folder.clone());

        InstallConfig {
            folder,
            release,
            namespace: self.namespace,
            charts_path: self.charts_path,
            values_file: self.values.filter(|p| !p.as_os_str().is_empty()),
            set_values: self.set.filter(|s| !s.is_empty()),
            dry_run: self.dry_run,
            wait: self.wait,
            timeout: self.timeout,
            create_namespace: self.create_namespace,
            upgrade: self.upgrade,
            kubeconfig: self.kubeconfig.filter(|k| !k.is_empty()),
            kube_context: self.context.filter(|c| !c.is_empty()),
        }
    }
}
