//! `opsdeck docker scan` command. Scan an image for vulnerabilities.

use std::time::Duration;

use clap::Args;
use colored::Colorize;
use opsdeck_core::OpsConfig;
use opsdeck_runtime::ScanRunner;

use crate::output;

#[derive(Args)]
pub struct ScanArgs {
    /// Image reference (e.g., "nginx:1.25")
    pub image: String,

    /// Scan deadline in seconds (default: scan.timeout_secs, none if unset)
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(args: ScanArgs, config: &OpsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let binary = &config.scan.binary;
    let runner = ScanRunner::resolve(binary, &config.scan.format)?;
    let deadline = args.timeout.or(config.scan.timeout_secs).map(Duration::from_secs);
    let workdir = std::env::current_dir()?;

    let spinner = output::spinner(format!("Running '{} image' scan", binary));
    let result = runner.scan(&args.image, &workdir, deadline).await;
    spinner.finish_and_clear();

    let report = result.map_err(|e| format!("failed to run '{} image': {}", binary, e))?;
    if !report.is_empty() {
        output::info(format!("{} scan results:", binary));
        println!("{}", report.output.yellow());
    }
    output::success("Scan completed successfully.");
    Ok(())
}
