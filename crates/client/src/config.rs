use std::path::PathBuf;
use std::sync::Arc;

use crate::credentials::{CredentialProvider, FileTokenStore, StaticToken};

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TOKEN_FILE: &str = ".itam_token";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash.
    pub api_url: String,
    /// Explicit bearer token; takes precedence over the token file.
    pub token: Option<String>,
    /// File holding a persisted bearer token.
    pub token_file: PathBuf,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `ITAM_API_URL`              | `http://localhost:8080` |
    /// | `ITAM_TOKEN`                | --                      |
    /// | `ITAM_TOKEN_FILE`           | `.itam_token`           |
    /// | `ITAM_REQUEST_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ITAM_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into())
            .trim()
            .trim_end_matches('/')
            .to_string();

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "ITAM_API_URL",
                expected: "an http(s) URL",
                value: api_url,
            });
        }

        let token = lookup("ITAM_TOKEN").filter(|v| !v.trim().is_empty());

        let token_file = lookup("ITAM_TOKEN_FILE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILE.into())
            .into();

        let request_timeout_secs = match lookup("ITAM_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    var: "ITAM_REQUEST_TIMEOUT_SECS",
                    expected: "a positive integer",
                    value: raw,
                })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            token,
            token_file,
            request_timeout_secs,
        })
    }

    /// Credential provider for this configuration: the explicit token when
    /// set, otherwise the token file.
    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        match &self.token {
            Some(token) => Arc::new(StaticToken::new(Some(token.clone()))),
            None => Arc::new(FileTokenStore::new(self.token_file.clone())),
        }
    }
}
