//! Chart installer
//!
//! Installs a Helm chart from the packaged chart directory and waits for its
//! Deployments to become ready.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use sockshop_tools::cli::InstallArgs;
use sockshop_tools::deploy::{list_charts, ChartInstaller, SystemRunner};
use sockshop_tools::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> ExitCode {
    let args = InstallArgs::parse();

    init_logger(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    if args.list {
        return match list_charts(&args.charts_path) {
            Ok(charts) if charts.is_empty() => {
                println!("No charts found in {}", args.charts_path.display());
                ExitCode::SUCCESS
            }
            Ok(charts) => {
                println!("Charts in {}:", args.charts_path.display());
                for chart in charts {
                    println!("  {}", chart.summary());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    let installer = ChartInstaller::new(args.into_config(), SystemRunner);
    if let Err(e) = installer.run().await {
        error!("{:#}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Successfully installed chart from folder: {}",
        installer.config().folder
    );
    ExitCode::SUCCESS
}
