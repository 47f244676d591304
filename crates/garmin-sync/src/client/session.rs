//! Resumable API session
//!
//! Obtaining a token (the SSO dance) happens outside this program; we only
//! resume a previously saved session from disk and refuse to run without one.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Bearer token for Connect API requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiToken {
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: String,
    /// Unix timestamp after which the token is no longer valid
    #[serde(default)]
    pub expires_at: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl ApiToken {
    /// Check if the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at != 0 && self.expires_at < Utc::now().timestamp()
    }

    /// Returns the Authorization header value
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// File-based session persistence at the configured session path
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the saved token, if any
    pub fn load(&self) -> Result<Option<ApiToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let token: ApiToken = serde_json::from_str(&json)?;
        Ok(Some(token))
    }

    /// Save a token for later resumption
    pub fn save(&self, token: &ApiToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            crate::config::ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, json)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Resume a usable session or fail the invocation
    pub fn resume(&self) -> Result<ApiToken> {
        match self.load()? {
            None => Err(SyncError::NotAuthenticated),
            Some(token) if token.is_expired() => {
                Err(SyncError::auth("Session token has expired"))
            }
            Some(token) => Ok(token),
        }
    }

    /// Remove the saved session
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
