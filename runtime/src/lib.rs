//! opsdeck runtime - drivers for the external tools opsdeck wraps.
//!
//! Nothing here reimplements registry, scanning or state storage semantics.
//! Each driver resolves a tool or endpoint, invokes it, and interprets what
//! comes back:
//!
//! - [`process`]: secure binary resolution and restricted-environment invocation
//! - [`terraform`]: remote state retrieval, backend precheck, error remediation
//! - [`docker`]: registry push over the daemon API and image scanning

pub mod docker;
pub mod process;
pub mod terraform;

#[cfg(all(test, unix))]
pub(crate) mod testutil;

// Re-export common types
pub use docker::{
    AuthCredential, CredentialProvider, DaemonClient, DaemonEndpoint, EnvCredentials,
    ImageReference, NoProgress, ProgressSink, PushConsumer, PushEvent, PushState, PushSummary,
    RegistryPushDriver, ScanReport, ScanRunner, StaticCredentials,
};
pub use process::{ExitError, ProcessResult, SecureProcessInvoker, SECURE_PATH};
pub use terraform::{check_backend, classify_error, StateRetriever, REMEDIATIONS};

/// opsdeck runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
