use std::path::PathBuf;

use thiserror::Error;

/// opsdeck error types
#[derive(Error, Debug)]
pub enum OpsError {
    /// Binary could not be located on the search path
    #[error("{name} binary not found in PATH")]
    BinaryNotFound { name: String },

    /// Resolved binary is group- or world-writable
    #[error("{} is writable by group or others; insecure PATH configuration", path.display())]
    InsecureBinary { path: PathBuf },

    /// External process failed to start or exited non-zero
    #[error("{message}")]
    ProcessError { message: String },

    /// State pull succeeded but produced no output
    #[error("received empty state")]
    EmptyState,

    /// Remote state backend does not appear to be initialized
    #[error("no remote backend appears to be configured: {0}")]
    BackendNotConfigured(String),

    /// Registry credentials could not be encoded
    #[error("auth encoding failed: {0}")]
    AuthEncodingError(String),

    /// Registry reported a failure in the push stream
    #[error("push error: {0}")]
    PushError(String),

    /// Document could not be formatted
    #[error("failed to format JSON: {0}")]
    FormatError(String),

    /// Formatted document could not be persisted
    #[error("failed to write {}: {message}", path.display())]
    WriteError { path: PathBuf, message: String },

    /// Operation exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Container daemon rejected a request
    #[error("Daemon error: {status} - {message}")]
    DaemonError { status: u16, message: String },

    /// Image reference could not be used
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    /// Working directory is not usable
    #[error("Invalid working directory {}: {message}", path.display())]
    InvalidWorkdir { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for OpsError {
    fn from(err: serde_json::Error) -> Self {
        OpsError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for OpsError {
    fn from(err: serde_yaml::Error) -> Self {
        OpsError::SerializationError(err.to_string())
    }
}

/// Result type alias for opsdeck operations
pub type Result<T> = std::result::Result<T, OpsError>;
