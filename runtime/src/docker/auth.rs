//! Registry credentials and the push auth token.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use opsdeck_core::error::{OpsError, Result};
use serde::Serialize;

/// Username/password pair for one push call.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthCredential {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl AuthCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    /// Encode as the daemon's `X-Registry-Auth` value: JSON, then URL-safe base64.
    pub fn encode(&self) -> Result<String> {
        let json =
            serde_json::to_vec(self).map_err(|e| OpsError::AuthEncodingError(e.to_string()))?;
        Ok(URL_SAFE.encode(json))
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials at push time.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<AuthCredential>;
}

/// Reads credentials from two environment variables on every call.
///
/// Unset variables yield empty fields, which the registry treats as anonymous.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    username_var: String,
    password_var: String,
}

impl EnvCredentials {
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new("DOCKER_USERNAME", "DOCKER_PASSWORD")
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<AuthCredential> {
        let username = std::env::var(&self.username_var).unwrap_or_default();
        let password = std::env::var(&self.password_var).unwrap_or_default();
        if username.is_empty() {
            tracing::debug!(var = %self.username_var, "No registry username set, pushing anonymously");
        }
        Ok(AuthCredential { username, password })
    }
}

/// Fixed credentials, for callers that already hold them.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub AuthCredential);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(AuthCredential::new(username, password))
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<AuthCredential> {
        Ok(self.0.clone())
    }
}
