//! Chart deployment
//!
//! Discovers Helm charts on disk and installs them with `helm` and `kubectl`.

mod chart;
mod command;
mod installer;

pub use chart::{is_chart, list_charts, read_metadata, ChartInfo, ChartMetadata, CHART_MANIFEST};
pub use command::{CommandLine, CommandOutput, CommandRunner, OutputMode, SystemRunner};
pub use installer::{ChartInstaller, InstallConfig, ValidationError, DEFAULT_TIMEOUT};
