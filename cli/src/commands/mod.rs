//! CLI command definitions and dispatch.

mod push;
mod scan;
mod state_pull;
mod version;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opsdeck_core::OpsConfig;

/// opsdeck: image push, image scan and remote state pull.
#[derive(Parser)]
#[command(name = "opsdeck", version, about)]
pub struct Cli {
    /// Configuration file (default: ~/.opsdeck/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Container image operations
    Docker(DockerArgs),
    /// Infrastructure state operations
    Tf(TfArgs),
    /// Show version information
    Version(version::VersionArgs),
}

#[derive(Args)]
pub struct DockerArgs {
    #[command(subcommand)]
    pub command: DockerCommand,
}

#[derive(Subcommand)]
pub enum DockerCommand {
    /// Push an image to its registry
    Push(push::PushArgs),
    /// Scan an image for vulnerabilities
    Scan(scan::ScanArgs),
}

#[derive(Args)]
pub struct TfArgs {
    #[command(subcommand)]
    pub command: TfCommand,
}

#[derive(Subcommand)]
pub enum TfCommand {
    /// Pull the current remote state
    StatePull(state_pull::StatePullArgs),
}

/// Load the configuration named by `--config`, or the default one.
fn load_config(path: Option<&PathBuf>) -> opsdeck_core::Result<OpsConfig> {
    match path {
        Some(path) => OpsConfig::load(path),
        None => OpsConfig::load_default(),
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli { config, command } = cli;
    match command {
        Command::Docker(docker) => {
            let config = load_config(config.as_ref())?;
            match docker.command {
                DockerCommand::Push(args) => push::execute(args, &config).await,
                DockerCommand::Scan(args) => scan::execute(args, &config).await,
            }
        }
        Command::Tf(tf) => {
            let config = load_config(config.as_ref())?;
            match tf.command {
                TfCommand::StatePull(args) => state_pull::execute(args, &config).await,
            }
        }
        Command::Version(args) => version::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_push() {
        let cli = Cli::parse_from(["opsdeck", "docker", "push", "team/app:v1", "--timeout", "60"]);
        match cli.command {
            Command::Docker(DockerArgs {
                command: DockerCommand::Push(args),
            }) => {
                assert_eq!(args.image, "team/app:v1");
                assert_eq!(args.timeout, Some(60));
                assert!(!args.quiet);
            }
            _ => panic!("Expected docker push"),
        }
    }

    #[test]
    fn test_parse_state_pull_with_global_config() {
        let cli = Cli::parse_from([
            "opsdeck",
            "tf",
            "state-pull",
            "--dir",
            "infra",
            "--output",
            "state.json",
            "--config",
            "ops.yaml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("ops.yaml")));
        match cli.command {
            Command::Tf(TfArgs {
                command: TfCommand::StatePull(args),
            }) => {
                assert_eq!(args.dir, PathBuf::from("infra"));
                assert_eq!(args.output, Some(PathBuf::from("state.json")));
            }
            _ => panic!("Expected tf state-pull"),
        }
    }

    #[test]
    fn test_state_pull_defaults_to_current_dir() {
        let cli = Cli::parse_from(["opsdeck", "tf", "state-pull"]);
        match cli.command {
            Command::Tf(TfArgs {
                command: TfCommand::StatePull(args),
            }) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(args.output.is_none());
            }
            _ => panic!("Expected tf state-pull"),
        }
    }
}
