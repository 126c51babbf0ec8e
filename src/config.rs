//! Configuration management
//!
//! Process-wide defaults are read once at startup from an optional YAML file
//! merged with `CASEBRIDGE_`-prefixed environment variables. Per-invocation
//! overrides live in [`crate::session`], not here.

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Documented suffix appended to the API origin to derive the token endpoint
/// when `token_url` is not configured explicitly.
pub const TOKEN_URL_SUFFIX: &str = "/oauth2/v1/token";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream DX API connection defaults
    pub api: ApiConfig,
    /// Server behavior
    pub server: ServerConfig,
}

/// Upstream DX API connection settings (the process-wide default identity)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the DX REST API, e.g. `https://host/prweb/api/dx/v2`
    pub base_url: String,
    /// OAuth2 token endpoint. Derived from `base_url` when empty.
    pub token_url: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
}

/// Server behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Deadline applied to every outbound HTTP call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Deadline applied to the OAuth2 token exchange
    #[serde(with = "humantime_serde")]
    pub token_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            token_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or required API fields are missing after the merge.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("CASEBRIDGE_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.api.normalize()?;

        Ok(config)
    }
}

impl ApiConfig {
    /// Validate required fields and derive `token_url` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url`, `client_id`, or `client_secret` is
    /// missing, or if no token URL is supplied and none can be derived.
    pub fn normalize(&mut self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config(
                "api.base_url is required (CASEBRIDGE_API__BASE_URL)".to_string(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::Config(
                "api.client_id is required (CASEBRIDGE_API__CLIENT_ID)".to_string(),
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config(
                "api.client_secret is required (CASEBRIDGE_API__CLIENT_SECRET)".to_string(),
            ));
        }

        // Trailing slashes produce double-slash paths downstream
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        if self.token_url.trim().is_empty() {
            self.token_url = derive_token_url(&self.base_url).ok_or_else(|| {
                Error::Config(format!(
                    "api.token_url is not set and cannot be derived from base_url '{}'",
                    self.base_url
                ))
            })?;
        }

        Ok(())
    }
}

/// Derive the OAuth2 token endpoint from a DX base URL.
///
/// The API base conventionally embeds an `/api/` segment
/// (`https://host/prweb/api/dx/v2`); the token service lives beside the API
/// root, so everything from `/api/` onward is dropped before appending
/// [`TOKEN_URL_SUFFIX`].
#[must_use]
pub fn derive_token_url(base_url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() {
        return None;
    }

    let root = base.find("/api/").map_or(base, |idx| &base[..idx]);
    Some(format!("{root}{TOKEN_URL_SUFFIX}"))
}
