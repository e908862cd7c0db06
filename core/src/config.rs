use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OpsError, Result};

/// Default container daemon endpoint.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// opsdeck configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    /// Container daemon and registry push settings
    pub docker: DockerConfig,

    /// Infrastructure-state tool settings
    pub terraform: TerraformConfig,

    /// Vulnerability scanner settings
    pub scan: ScanConfig,
}

impl OpsConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            OpsError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&data).map_err(|e| {
            OpsError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Parse configuration from a YAML string. Missing fields take defaults.
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Load `~/.opsdeck/config.yaml` if it exists, otherwise defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Return the path to the default configuration file (~/.opsdeck/config.yaml).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".opsdeck").join("config.yaml"))
    }
}

/// Container daemon and push configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Daemon endpoint (`unix://...` or `tcp://...`). Falls back to
    /// `DOCKER_HOST`, then the local socket.
    pub host: Option<String>,

    /// Overall deadline for one push, in seconds
    pub push_timeout_secs: u64,

    /// Environment variable holding the registry username
    pub username_env: String,

    /// Environment variable holding the registry password
    pub password_env: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            push_timeout_secs: 300,
            username_env: "DOCKER_USERNAME".to_string(),
            password_env: "DOCKER_PASSWORD".to_string(),
        }
    }
}

impl DockerConfig {
    /// Resolve the daemon endpoint: configured host, then `DOCKER_HOST`, then the default socket.
    pub fn endpoint(&self) -> String {
        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            return host.to_string();
        }
        std::env::var("DOCKER_HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string())
    }
}

/// Infrastructure-state tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// Logical binary name resolved on the search path
    pub binary: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
        }
    }
}

/// Vulnerability scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Logical binary name resolved on the search path
    pub binary: String,

    /// Output format passed to the scanner
    pub format: String,

    /// Optional deadline for one scan, in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            binary: "trivy".to_string(),
            format: "table".to_string(),
            timeout_secs: None,
        }
    }
}
