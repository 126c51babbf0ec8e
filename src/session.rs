//! Per-invocation configuration resolution
//!
//! Every tool call runs against an [`EffectiveConfig`]: the process defaults
//! merged with an optional `sessionCredentials` override supplied in the
//! call's arguments. Resolution is a pure function; the result is immutable
//! for the lifetime of the invocation and is dropped when it returns.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::{ApiConfig, derive_token_url};
use crate::error::{DxError, ErrorKind};

/// Optional per-invocation credential override, accepted by every tool under
/// the `sessionCredentials` argument.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    /// Overrides the default DX base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Overrides (or supplies) the token endpoint
    #[serde(default)]
    pub token_url: Option<String>,
    /// Overrides the OAuth2 client id
    #[serde(default)]
    pub client_id: Option<String>,
    /// Overrides the OAuth2 client secret
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl SessionCredentials {
    /// True when no field is supplied (treated the same as an absent override).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.token_url.is_none()
            && self.client_id.is_none()
            && self.client_secret.is_none()
    }
}

/// The immutable configuration one invocation runs against.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// DX API base URL (no trailing slash)
    pub base_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Diagnostics: unique id for this invocation's auth context
    pub session_id: String,
    /// Diagnostics: `shared` (process defaults) or `session` (override)
    pub auth_mode: &'static str,
    /// Diagnostics: `env` (defaults) or `request` (override supplied)
    pub config_source: &'static str,
}

impl EffectiveConfig {
    /// Stable fingerprint over the credential triple.
    ///
    /// Two configurations with the same fingerprint share a cached token;
    /// different fingerprints never interact.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.token_url.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.client_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.client_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Short fingerprint prefix safe for log output.
    #[must_use]
    pub fn fingerprint_tag(&self) -> String {
        self.fingerprint()[..8].to_string()
    }
}

/// Merge process defaults with an optional per-invocation override.
///
/// Override fields replace defaults individually; missing fields fall
/// through. When the override changes `base_url` without supplying a token
/// URL, the token endpoint is re-derived from the overridden base.
///
/// # Errors
///
/// Returns `CONFIG_INVALID` when a required field ends up empty or when no
/// token URL is supplied or derivable.
pub fn resolve(
    defaults: &ApiConfig,
    overrides: Option<&SessionCredentials>,
) -> Result<EffectiveConfig, DxError> {
    let overrides = overrides.filter(|o| !o.is_empty());

    let (auth_mode, config_source) = match overrides {
        Some(_) => ("session", "request"),
        None => ("shared", "env"),
    };

    let base_url = overrides
        .and_then(|o| o.base_url.clone())
        .unwrap_or_else(|| defaults.base_url.clone())
        .trim_end_matches('/')
        .to_string();

    let client_id = overrides
        .and_then(|o| o.client_id.clone())
        .unwrap_or_else(|| defaults.client_id.clone());

    let client_secret = overrides
        .and_then(|o| o.client_secret.clone())
        .unwrap_or_else(|| defaults.client_secret.clone());

    if base_url.is_empty() {
        return Err(DxError::new(ErrorKind::ConfigInvalid, "base URL is not configured"));
    }
    if client_id.trim().is_empty() {
        return Err(DxError::new(ErrorKind::ConfigInvalid, "client id is not configured"));
    }
    if client_secret.trim().is_empty() {
        return Err(DxError::new(
            ErrorKind::ConfigInvalid,
            "client secret is not configured",
        ));
    }

    // Explicit override wins; an overridden base re-derives the endpoint so
    // session credentials against another host do not leak tokens to the
    // default identity provider.
    let token_url = match overrides.and_then(|o| o.token_url.clone()) {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            let base_overridden = overrides.is_some_and(|o| o.base_url.is_some());
            if base_overridden || defaults.token_url.trim().is_empty() {
                derive_token_url(&base_url).ok_or_else(|| {
                    DxError::new(
                        ErrorKind::ConfigInvalid,
                        format!("no token URL supplied and none derivable from '{base_url}'"),
                    )
                })?
            } else {
                defaults.token_url.clone()
            }
        }
    };

    Ok(EffectiveConfig {
        base_url,
        token_url,
        client_id,
        client_secret,
        session_id: uuid::Uuid::new_v4().to_string(),
        auth_mode,
        config_source,
    })
}
