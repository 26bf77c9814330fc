//! Opaque credential provider
//!
//! The host hands over a JSON credential blob and a comma-separated scope list from its
//! own secret store. Token acquisition and refresh live outside this crate; the
//! collector only asks a [`CredentialProvider`] for a bearer token before each page.

use crate::config::CredentialsConfig;
use crate::{CollectorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Supplies bearer tokens for upstream requests
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a token valid for the next request
    async fn bearer_token(&self) -> Result<String>;
}

/// The fields of the credential blob the collector reads
#[derive(Deserialize)]
struct CredentialBlob {
    access_token: String,
}

/// Credentials with a pre-issued access token
#[derive(Clone)]
pub struct StaticCredentials {
    token: String,
    scopes: Vec<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            token: token.into(),
            scopes,
        }
    }

    /// Builds credentials from a JSON blob and a comma-separated scope list
    ///
    /// The blob must be a JSON object with a non-empty `access_token`; any other
    /// fields are ignored.
    pub fn from_blob(blob: &str, scopes: &str) -> Result<Self> {
        let parsed: CredentialBlob = serde_json::from_str(blob)
            .map_err(|e| CollectorError::Credentials(format!("invalid credential blob: {}", e)))?;

        if parsed.access_token.trim().is_empty() {
            return Err(CollectorError::Credentials(
                "credential blob has an empty access_token".to_string(),
            ));
        }

        let scopes = parse_scopes(scopes);
        if scopes.is_empty() {
            return Err(CollectorError::Credentials(
                "at least one scope is required".to_string(),
            ));
        }

        Ok(Self::new(parsed.access_token, scopes))
    }

    /// Reads the credential blob named in the configuration
    pub fn load(config: &CredentialsConfig) -> Result<Self> {
        let blob = std::fs::read_to_string(Path::new(&config.credentials_path))?;
        Self::from_blob(&blob, &config.scopes)
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Splits a comma-separated scope list, trimming entries and dropping empties
pub fn parse_scopes(scopes: &str) -> Vec<String> {
    scopes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
