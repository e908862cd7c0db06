//! Remote state retrieval, formatting and persistence.

use std::io::Write;
use std::path::Path;

use opsdeck_core::error::{OpsError, Result};

use crate::process::SecureProcessInvoker;

/// File mode for persisted state documents.
pub const STATE_FILE_MODE: u32 = 0o644;

/// Pulls remote state through a resolved infrastructure-state binary.
#[derive(Debug, Clone)]
pub struct StateRetriever {
    invoker: SecureProcessInvoker,
}

impl StateRetriever {
    pub fn new(invoker: SecureProcessInvoker) -> Self {
        Self { invoker }
    }

    /// Resolve `binary` on the caller's search path and wrap it.
    pub fn resolve(binary: &str) -> Result<Self> {
        Ok(Self::new(SecureProcessInvoker::resolve(binary)?))
    }

    pub fn invoker(&self) -> &SecureProcessInvoker {
        &self.invoker
    }

    /// Run the advisory backend precheck against `workdir`.
    pub async fn check_backend(&self, workdir: &Path) -> Result<()> {
        super::check_backend(&self.invoker, workdir).await
    }

    /// Run `state pull` in `workdir` and return the raw state document.
    ///
    /// A clean exit with no output is `EmptyState`, never an empty success.
    pub async fn pull(&self, workdir: &Path) -> Result<Vec<u8>> {
        tracing::info!(workdir = %workdir.display(), "Pulling remote state");

        let state = self
            .invoker
            .run(&["state", "pull"], workdir)
            .await?
            .into_stdout()?;

        if state.is_empty() {
            return Err(OpsError::EmptyState);
        }

        tracing::debug!(bytes = state.len(), "Remote state pulled");
        Ok(state)
    }
}

/// Check that `dir` is a directory holding at least one configuration file.
pub fn validate_workdir(dir: &Path) -> Result<()> {
    let invalid = |message: &str| OpsError::InvalidWorkdir {
        path: dir.to_path_buf(),
        message: message.to_string(),
    };

    let metadata = std::fs::metadata(dir).map_err(|e| invalid(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory"));
    }

    let has_config = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".tf") || name.ends_with(".tf.json")
        });
    if !has_config {
        return Err(invalid("no .tf configuration files found"));
    }

    Ok(())
}

/// Re-indent a JSON state document with two spaces, keeping key order and
/// number text as received.
///
/// The result always ends with a newline.
pub fn format_state(state: &[u8]) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_slice(state).map_err(|e| OpsError::FormatError(e.to_string()))?;
    let mut formatted =
        serde_json::to_string_pretty(&value).map_err(|e| OpsError::FormatError(e.to_string()))?;
    formatted.push('\n');
    Ok(formatted)
}

/// Format `state` and write it to `path` with [`STATE_FILE_MODE`].
///
/// Nothing is written if formatting fails.
pub fn persist_state(state: &[u8], path: &Path) -> Result<()> {
    let formatted = format_state(state)?;

    let write_error = |e: std::io::Error| OpsError::WriteError {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(STATE_FILE_MODE);
    }

    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(formatted.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;

    // An existing file keeps its old mode through open(); reset it.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(STATE_FILE_MODE))
            .map_err(write_error)?;
    }

    tracing::info!(path = %path.display(), bytes = formatted.len(), "State written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_state_indents_two_spaces() {
        let formatted = format_state(br#"{"a":1}"#).unwrap();
        assert_eq!(formatted, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_format_state_preserves_key_order() {
        let formatted = format_state(br#"{"version":4,"serial":2,"lineage":"x"}"#).unwrap();
        let version = formatted.find("version").unwrap();
        let serial = formatted.find("serial").unwrap();
        let lineage = formatted.find("lineage").unwrap();
        assert!(version < serial && serial < lineage);
    }

    #[test]
    fn test_format_state_keeps_number_text() {
        let formatted =
            format_state(br#"{"big":123456789012345678901234567890,"f":1.10,"e":1e2}"#)
                .unwrap();
        assert_eq!(
            formatted,
            "{\n  \"big\": 123456789012345678901234567890,\n  \"f\": 1.10,\n  \"e\": 1e2\n}\n"
        );
    }

    #[test]
    fn test_format_state_rejects_invalid_json() {
        let result = format_state(b"not json");
        assert!(matches!(result, Err(OpsError::FormatError(_))));
    }

    #[test]
    fn test_persist_state_writes_formatted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        persist_state(br#"{"a":1}"#, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_state_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        persist_state(br#"{"a":1}"#, &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, STATE_FILE_MODE);
    }

    #[test]
    fn test_persist_state_format_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let result = persist_state(b"{truncated", &path);
        assert!(matches!(result, Err(OpsError::FormatError(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_state_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("state.json");

        let result = persist_state(br#"{"a":1}"#, &path);
        assert!(matches!(result, Err(OpsError::WriteError { .. })));
    }

    #[test]
    fn test_validate_workdir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            validate_workdir(dir.path()),
            Err(OpsError::InvalidWorkdir { .. })
        ));

        std::fs::write(dir.path().join("main.tf"), "terraform {}").unwrap();
        validate_workdir(dir.path()).unwrap();
    }

    #[test]
    fn test_validate_workdir_accepts_json_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.tf.json"), "{}").unwrap();
        validate_workdir(dir.path()).unwrap();
    }

    #[test]
    fn test_validate_workdir_missing_or_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.tf");
        std::fs::write(&file, "").unwrap();

        assert!(validate_workdir(&dir.path().join("absent")).is_err());
        assert!(matches!(
            validate_workdir(&file),
            Err(OpsError::InvalidWorkdir { .. })
        ));
    }

    #[cfg(unix)]
    mod pull {
        use super::*;
        use crate::testutil::write_script;

        fn retriever(dir: &Path, body: &str) -> StateRetriever {
            write_script(dir, "terraform", body, 0o755);
            StateRetriever::new(SecureProcessInvoker::resolve_in("terraform", dir).unwrap())
        }

        #[tokio::test]
        async fn test_pull_returns_stdout() {
            let bin = TempDir::new().unwrap();
            let work = TempDir::new().unwrap();
            let retriever = retriever(
                bin.path(),
                "[ \"$1 $2\" = \"state pull\" ] || exit 9\nprintf '{\"a\":1}'",
            );

            let state = retriever.pull(work.path()).await.unwrap();
            assert_eq!(state, br#"{"a":1}"#);
            assert_eq!(format_state(&state).unwrap(), "{\n  \"a\": 1\n}\n");
        }

        #[tokio::test]
        async fn test_pull_empty_output_is_empty_state() {
            let bin = TempDir::new().unwrap();
            let work = TempDir::new().unwrap();
            let retriever = retriever(bin.path(), "exit 0");

            let result = retriever.pull(work.path()).await;
            assert!(matches!(result, Err(OpsError::EmptyState)));
        }

        #[tokio::test]
        async fn test_pull_failure_includes_stderr() {
            let bin = TempDir::new().unwrap();
            let work = TempDir::new().unwrap();
            let retriever = retriever(
                bin.path(),
                "echo 'Error: AccessDenied: access denied' >&2\nexit 1",
            );

            match retriever.pull(work.path()).await {
                Err(OpsError::ProcessError { message }) => {
                    assert!(message.starts_with("exit status 1"));
                    assert!(message.contains("access denied"));
                }
                other => panic!("Expected ProcessError, got {:?}", other),
            }
        }
    }
}
