//! opsdeck core - shared error taxonomy and configuration.
//!
//! Everything here is free of I/O beyond reading the optional config file,
//! so both the runtime and the CLI can depend on it.

pub mod config;
pub mod error;

pub use config::{DockerConfig, OpsConfig, ScanConfig, TerraformConfig};
pub use error::{OpsError, Result};

/// opsdeck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
