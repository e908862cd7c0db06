//! `opsdeck docker push` command. Push a local image to its registry.

use std::time::Duration;

use clap::Args;
use opsdeck_core::OpsConfig;
use opsdeck_runtime::{DaemonClient, EnvCredentials, NoProgress, RegistryPushDriver};

use crate::output::PushProgress;

#[derive(Args)]
pub struct PushArgs {
    /// Image reference (e.g., "ghcr.io/org/image:tag")
    pub image: String,

    /// Overall push deadline in seconds (default: docker.push_timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: PushArgs, config: &OpsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.docker.push_timeout_secs));
    let client = DaemonClient::from_host(&config.docker.endpoint())?;

    // Credentials are read from the environment when the push starts
    let credentials = EnvCredentials::new(&config.docker.username_env, &config.docker.password_env);
    let driver = RegistryPushDriver::new(client, credentials).with_timeout(timeout);

    if args.quiet {
        let summary = driver.push(&args.image, &mut NoProgress).await?;
        println!("{}", summary.image);
        return Ok(());
    }

    let mut progress = PushProgress::start(&args.image);
    match driver.push(&args.image, &mut progress).await {
        Ok(summary) => {
            progress.finish_success(format!("Successfully pushed image {}", summary.image));
            Ok(())
        }
        Err(e) => {
            progress.finish_error(format!("Failed to push image {}", args.image));
            Err(e.into())
        }
    }
}
