//! Chart directory discovery
//!
//! A chart is a directory under the charts path that contains `Chart.yaml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File that marks a directory as a Helm chart
pub const CHART_MANIFEST: &str = "Chart.yaml";

/// The subset of `Chart.yaml` shown by `--list`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChartMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "appVersion")]
    pub app_version: Option<String>,
    pub description: Option<String>,
}

/// A chart found under the charts path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartInfo {
    /// Folder name, as passed to `--folder`
    pub folder: String,
    pub path: PathBuf,
    /// `None` when `Chart.yaml` could not be parsed
    pub metadata: Option<ChartMetadata>,
}

impl ChartInfo {
    /// One-line summary for listings
    pub fn summary(&self) -> String {
        let Some(metadata) = &self.metadata else {
            return self.folder.clone();
        };

        let mut line = self.folder.clone();
        if let Some(version) = &metadata.version {
            line.push_str(&format!(" ({version})"));
        }
        if let Some(description) = &metadata.description {
            line.push_str(&format!(" - {description}"));
        }
        line
    }
}

/// Whether `dir` contains a chart manifest
pub fn is_chart(dir: &Path) -> bool {
    dir.join(CHART_MANIFEST).is_file()
}

/// Read the manifest metadata of the chart in `dir`
pub fn read_metadata(dir: &Path) -> Result<ChartMetadata> {
    let path = dir.join(CHART_MANIFEST);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// List the charts under `charts_path`, sorted by folder name
pub fn list_charts(charts_path: &Path) -> Result<Vec<ChartInfo>> {
    let entries = std::fs::read_dir(charts_path).with_context(|| {
        format!("failed to read charts directory {}", charts_path.display())
    })?;

    let mut charts = Vec::new();
    for entry in entries {
        let entry = entry.context("failed to read charts directory entry")?;
        let path = entry.path();
        if !path.is_dir() || !is_chart(&path) {
            continue;
        }

        let metadata = match read_metadata(&path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!("{:#}", e);
                None
            }
        };

        charts.push(ChartInfo {
            folder: entry.file_name().to_string_lossy().to_string(),
            path,
            metadata,
        });
    }

    charts.sort_by(|a, b| a.folder.cmp(&b.folder));
    Ok(charts)
}
