//! `opsdeck tf state-pull` command. Fetch the current remote state.

use std::path::{Path, PathBuf};

use clap::Args;
use opsdeck_core::OpsConfig;
use opsdeck_runtime::terraform::{format_state, persist_state, validate_workdir};
use opsdeck_runtime::{classify_error, StateRetriever};

use crate::output;

#[derive(Args)]
pub struct StatePullArgs {
    /// Directory holding the configuration
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Write the formatted state to this file instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(
    args: StatePullArgs,
    config: &OpsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_workdir(&args.dir)?;
    let retriever = StateRetriever::resolve(&config.terraform.binary)?;

    if let Err(e) = retriever.check_backend(&args.dir).await {
        output::warn(format!("No remote backend configured or unable to check: {}", e));
        output::info("Attempting to pull state anyway...");
    }

    output::info(format!("Pulling remote state from: {}", display_name(&args.dir)));

    let state = match retriever.pull(&args.dir).await {
        Ok(state) => state,
        Err(e) => {
            output::error(format!("Failed to pull remote state: {}", e));
            eprintln!("{}", classify_error(&e.to_string()));
            std::process::exit(1);
        }
    };

    match &args.output {
        Some(path) => {
            persist_state(&state, path)?;
            output::success(format!("Remote state saved to: {}", path.display()));
        }
        None => {
            match format_state(&state) {
                Ok(formatted) => print!("{}", formatted),
                Err(e) => {
                    tracing::debug!(error = %e, "Printing unformatted state");
                    println!("{}", String::from_utf8_lossy(&state));
                }
            }
            output::success("Successfully pulled remote state");
        }
    }

    Ok(())
}

/// Last path component for display, resolving `.` to the real directory name.
fn display_name(dir: &Path) -> String {
    std::fs::canonicalize(dir)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
