//! Advisory remote-backend precheck.
//!
//! Callers log a failure here as a warning and still attempt the pull: the
//! tool's metadata directory existing does not prove the backend is healthy,
//! and its absence does not prove the pull will fail.

use std::path::Path;

use opsdeck_core::error::{OpsError, Result};

use crate::process::SecureProcessInvoker;

/// Local metadata directory the tool creates on init.
const METADATA_DIR: &str = ".terraform";

/// Init flags that configure the backend without fetching modules.
const INIT_CHECK_ARGS: &[&str] = &["init", "-backend=true", "-get=false"];

/// Verify that `workdir` has an initialized remote backend.
pub async fn check_backend(invoker: &SecureProcessInvoker, workdir: &Path) -> Result<()> {
    let result = invoker.run(INIT_CHECK_ARGS, workdir).await?;
    if let Some(exit) = result.exit_error {
        tracing::debug!(
            workdir = %workdir.display(),
            exit = %exit,
            stderr = %result.stderr_text(),
            "Backend init check failed"
        );
        return Err(OpsError::BackendNotConfigured(
            "backend initialization check failed".to_string(),
        ));
    }

    if !workdir.join(METADATA_DIR).is_dir() {
        return Err(OpsError::BackendNotConfigured(format!(
            "{} directory not found, run 'terraform init' first",
            METADATA_DIR
        )));
    }

    Ok(())
}
