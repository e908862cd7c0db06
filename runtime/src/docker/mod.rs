//! Container image drivers: registry push through the daemon, and scanning.
//!
//! ```text
//!  image ref ──► ImageReference ──► DaemonClient::push ──► NDJSON stream
//!                                        ▲                      │
//!            CredentialProvider ─► token ┘                      ▼
//!                                                  PushConsumer ──► ProgressSink
//! ```

mod auth;
mod daemon;
mod events;
mod push;
pub mod reference;
mod scan;

pub use auth::{AuthCredential, CredentialProvider, EnvCredentials, StaticCredentials};
pub use daemon::{DaemonClient, DaemonEndpoint, PushStream};
pub use events::{
    ErrorDetail, NoProgress, ProgressSink, PushConsumer, PushEvent, PushState, LAYER_EXISTS,
    LAYER_EXISTS_UNITS, LAYER_PUSHED, LAYER_PUSHED_UNITS, PROGRESS_TOTAL,
};
pub use push::{consume_push_stream, PushSummary, RegistryPushDriver, DEFAULT_PUSH_TIMEOUT};
pub use reference::ImageReference;
pub use scan::{ScanReport, ScanRunner};
