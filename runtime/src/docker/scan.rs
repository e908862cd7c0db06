//! Vulnerability scan runner.
//!
//! The scanner's own formatted report is relayed verbatim; findings are not
//! parsed here.

use std::path::Path;
use std::time::Duration;

use opsdeck_core::error::Result;

use crate::process::SecureProcessInvoker;

/// Output of a successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub image: String,
    /// Scanner stdout, unmodified
    pub output: String,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

/// Caller variables the scanner needs to reach the container daemon.
const SCANNER_PASSTHROUGH: &[&str] = &["DOCKER_HOST"];

/// Runs `<scanner> image <ref> --format <format>`.
///
/// The scanner gets the restricted environment plus `DOCKER_HOST`, so a
/// remote or rootless daemon stays reachable.
#[derive(Debug, Clone)]
pub struct ScanRunner {
    invoker: SecureProcessInvoker,
    format: String,
}

impl ScanRunner {
    pub fn new(invoker: SecureProcessInvoker, format: impl Into<String>) -> Self {
        Self {
            invoker: invoker.with_passthrough(SCANNER_PASSTHROUGH.iter().copied()),
            format: format.into(),
        }
    }

    /// Resolve `binary` on the caller's search path.
    pub fn resolve(binary: &str, format: impl Into<String>) -> Result<Self> {
        Ok(Self::new(SecureProcessInvoker::resolve(binary)?, format))
    }

    pub fn invoker(&self) -> &SecureProcessInvoker {
        &self.invoker
    }

    /// Scan one image. A non-zero exit fails with the exit status and stderr.
    pub async fn scan(
        &self,
        image: &str,
        workdir: &Path,
        deadline: Option<Duration>,
    ) -> Result<ScanReport> {
        let args = ["image", image, "--format", self.format.as_str()];
        tracing::info!(image, scanner = %self.invoker.binary().display(), "Scanning image");

        let stdout = self
            .invoker
            .run_with_deadline(&args, workdir, deadline)
            .await?
            .into_stdout()?;

        Ok(ScanReport {
            image: image.to_string(),
            output: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testutil::write_script;
    use opsdeck_core::error::OpsError;
    use tempfile::TempDir;

    fn runner(dir: &Path, body: &str) -> ScanRunner {
        write_script(dir, "trivy", body, 0o755);
        ScanRunner::new(SecureProcessInvoker::resolve_in("trivy", dir).unwrap(), "table")
    }

    #[tokio::test]
    async fn test_scan_relays_stdout_verbatim() {
        let dir = TempDir::new().unwrap();
        let runner = runner(
            dir.path(),
            "[ \"$1 $2 $3 $4\" = \"image app:v1 --format table\" ] || exit 9\n\
             echo 'Total: 0 (UNKNOWN: 0, LOW: 0)'\n\
             echo 'scanning...' >&2",
        );

        let report = runner.scan("app:v1", dir.path(), None).await.unwrap();
        assert_eq!(report.image, "app:v1");
        assert_eq!(report.output, "Total: 0 (UNKNOWN: 0, LOW: 0)\n");
    }

    #[tokio::test]
    async fn test_scan_sees_docker_host() {
        std::env::set_var("DOCKER_HOST", "unix:///run/user/1000/docker.sock");
        let dir = TempDir::new().unwrap();
        let runner = runner(dir.path(), "echo \"${DOCKER_HOST:-unset}\"");

        assert_eq!(runner.invoker().passthrough(), ["DOCKER_HOST"]);
        let report = runner.scan("app:v1", dir.path(), None).await.unwrap();
        assert_eq!(report.output, "unix:///run/user/1000/docker.sock\n");
    }

    #[tokio::test]
    async fn test_scan_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let runner = runner(dir.path(), "echo 'FATAL image not found' >&2\nexit 1");

        match runner.scan("missing:latest", dir.path(), None).await {
            Err(OpsError::ProcessError { message }) => {
                assert_eq!(message, "exit status 1: FATAL image not found");
            }
            other => panic!("Expected ProcessError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_deadline() {
        let dir = TempDir::new().unwrap();
        let runner = runner(dir.path(), "sleep 5");

        let result = runner
            .scan("app:v1", dir.path(), Some(Duration::from_millis(100)))
            .await;
        assert!(matches!(result, Err(OpsError::Timeout(_))));
    }
}
