//! Secure external binary resolution and invocation.
//!
//! A binary is looked up once on the caller's search path and then checked
//! before it is ever executed: it must be statable, and must not be writable
//! by group or others. Every invocation runs with a cleared environment
//! holding only [`SECURE_PATH`], so neither an earlier PATH entry nor an
//! inherited variable can redirect what the tool loads afterwards.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use opsdeck_core::error::{OpsError, Result};

/// Search path handed to every child process.
pub const SECURE_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/bin";

/// Permission bits that make a binary unsafe to run (group/other write).
const INSECURE_MODE_BITS: u32 = 0o022;

/// A resolved, permission-checked external binary.
#[derive(Debug, Clone)]
pub struct SecureProcessInvoker {
    name: String,
    binary: PathBuf,
    passthrough: Vec<String>,
}

impl SecureProcessInvoker {
    /// Resolve `name` on the current process's `PATH`.
    pub fn resolve(name: &str) -> Result<Self> {
        let search_path = std::env::var_os("PATH").unwrap_or_default();
        Self::resolve_in(name, search_path)
    }

    /// Resolve `name` on an explicit search path (colon-separated on unix).
    pub fn resolve_in(name: &str, search_path: impl AsRef<OsStr>) -> Result<Self> {
        let not_found = || OpsError::BinaryNotFound {
            name: name.to_string(),
        };

        let cwd = std::env::current_dir()?;
        let binary = which::which_in(name, Some(search_path), &cwd).map_err(|e| {
            tracing::debug!(binary = name, error = %e, "Binary lookup failed");
            not_found()
        })?;
        let binary = if binary.is_absolute() {
            binary
        } else {
            cwd.join(binary)
        };

        let metadata = std::fs::metadata(&binary).map_err(|e| {
            tracing::debug!(path = %binary.display(), error = %e, "Unable to stat binary");
            not_found()
        })?;
        check_permissions(&binary, &metadata)?;

        tracing::debug!(binary = name, path = %binary.display(), "Resolved binary");
        Ok(Self {
            name: name.to_string(),
            binary,
            passthrough: Vec::new(),
        })
    }

    /// Copy the named variables from the caller's environment into every
    /// invocation, when set. `PATH` is never overridden.
    pub fn with_passthrough<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passthrough.extend(
            vars.into_iter()
                .map(|var| -> String { var.into() })
                .filter(|var| var != "PATH"),
        );
        self
    }

    /// Variables copied from the caller's environment.
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Logical name the binary was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the resolved binary.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// The fixed environment every invocation runs with, before passthrough.
    pub fn environment(&self) -> Vec<(&'static str, &'static str)> {
        vec![("PATH", SECURE_PATH)]
    }

    /// Run the binary with `args` in `workdir`, waiting for it to exit.
    pub async fn run(&self, args: &[&str], workdir: &Path) -> Result<ProcessResult> {
        self.run_with_deadline(args, workdir, None).await
    }

    /// Run the binary, killing it if `deadline` elapses first.
    ///
    /// Stdout and stderr are captured into separate buffers. A non-zero exit
    /// is reported in [`ProcessResult::exit_error`], not as an `Err`; only a
    /// failure to spawn or wait, or an elapsed deadline, is an `Err`.
    pub async fn run_with_deadline(
        &self,
        args: &[&str],
        workdir: &Path,
        deadline: Option<Duration>,
    ) -> Result<ProcessResult> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(args)
            .current_dir(workdir)
            .env_clear()
            .envs(self.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in &self.passthrough {
            if let Some(value) = std::env::var_os(var) {
                cmd.env(var, value);
            }
        }

        tracing::debug!(
            binary = %self.binary.display(),
            args = ?args,
            workdir = %workdir.display(),
            "Invoking external binary"
        );

        let child = cmd.spawn().map_err(|e| OpsError::ProcessError {
            message: format!("failed to start {}: {}", self.binary.display(), e),
        })?;

        let output = match deadline {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    OpsError::Timeout(format!(
                        "{} did not finish within {:?}",
                        self.name, limit
                    ))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| OpsError::ProcessError {
            message: format!("failed to wait for {}: {}", self.name, e),
        })?;

        let exit_error = if output.status.success() {
            None
        } else {
            Some(ExitError::from_status(&output.status))
        };

        Ok(ProcessResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_error,
        })
    }
}

#[cfg(unix)]
fn check_permissions(path: &Path, metadata: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & INSECURE_MODE_BITS != 0 {
        tracing::warn!(path = %path.display(), "Refusing group/world-writable binary");
        return Err(OpsError::InsecureBinary {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path, _metadata: &std::fs::Metadata) -> Result<()> {
    Ok(())
}

/// How a child process failed to exit cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitError {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed (unix only)
    pub signal: Option<i32>,
}

impl ExitError {
    fn from_status(status: &std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit status {}", code),
            (None, Some(signal)) => write!(f, "terminated by signal {}", signal),
            (None, None) => write!(f, "exited abnormally"),
        }
    }
}

/// Captured outcome of one external invocation.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_error: Option<ExitError>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_error.is_none()
    }

    /// Stderr as lossy UTF-8 with trailing whitespace removed.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }

    /// Stdout as lossy UTF-8.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Return stdout, or a `ProcessError` carrying the exit status and any stderr.
    pub fn into_stdout(self) -> Result<Vec<u8>> {
        match self.exit_error {
            None => Ok(self.stdout),
            Some(exit) => {
                let stderr = self.stderr_text();
                let message = if stderr.is_empty() {
                    exit.to_string()
                } else {
                    format!("{}: {}", exit, stderr)
                };
                Err(OpsError::ProcessError { message })
            }
        }
    }
}
