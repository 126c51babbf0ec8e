//! OAuth2 token cache
//!
//! Bearer tokens are obtained through the client-credentials grant and cached
//! per configuration fingerprint. Concurrent acquisitions for the same
//! fingerprint coalesce: one exchange goes over the wire, every waiter gets
//! its outcome.
//!
//! A slot holds the per-fingerprint mutual-exclusion guard and the current
//! token. The guard is an async mutex held across the exchange (that is what
//! coalesces waiters); the completed entry is installed through a separate
//! swap so readers on the fast path never block on the network. A task
//! cancelled mid-exchange releases the guard and installs nothing, so a
//! partial token can never be observed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use dashmap::DashMap;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{DxError, ErrorKind};
use crate::session::EffectiveConfig;

/// Validity margin: a token is treated as expired this long before the
/// provider's `expires_in` elapses.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// A successfully acquired token
#[derive(Debug, Clone)]
pub struct TokenEntry {
    /// Bearer token value
    pub access_token: String,
    /// Token type reported by the provider (normally `Bearer`)
    pub token_type: String,
    /// When the exchange completed
    pub acquired_at: Instant,
    /// When the token stops being usable
    pub expires_at: Instant,
}

impl TokenEntry {
    /// A token is valid while `now + skew` is still before its expiry.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Instant::now() + EXPIRY_SKEW < self.expires_at
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

/// Per-fingerprint cache slot
struct Slot {
    /// Serializes refreshes for this fingerprint
    guard: tokio::sync::Mutex<()>,
    /// Current token; written only after a completed exchange
    current: parking_lot::RwLock<Option<TokenEntry>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            guard: tokio::sync::Mutex::new(()),
            current: parking_lot::RwLock::new(None),
        }
    }
}

/// Process-wide token cache keyed by configuration fingerprint
pub struct TokenCache {
    http: Client,
    slots: DashMap<String, Arc<Slot>>,
    exchange_timeout: Duration,
}

impl TokenCache {
    /// Create a cache that performs exchanges on the given client.
    #[must_use]
    pub fn new(http: Client, exchange_timeout: Duration) -> Self {
        Self {
            http,
            slots: DashMap::new(),
            exchange_timeout,
        }
    }

    /// Return a valid bearer token for `config`, exchanging credentials if
    /// the cached one is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `AUTH_FAILED` when the OAuth2 exchange fails; nothing is
    /// cached in that case.
    pub async fn acquire(&self, config: &EffectiveConfig) -> Result<String, DxError> {
        let slot = self.slot(config);

        // Fast path: a valid token is already installed.
        if let Some(entry) = slot.current.read().as_ref() {
            if entry.is_valid() {
                return Ok(entry.access_token.clone());
            }
        }

        // Slow path: serialize refreshes for this fingerprint. Whoever wins
        // the guard performs the exchange; everyone queued behind re-checks
        // and finds the fresh token.
        let _guard = slot.guard.lock().await;

        if let Some(entry) = slot.current.read().as_ref() {
            if entry.is_valid() {
                return Ok(entry.access_token.clone());
            }
        }

        let entry = self.exchange(config).await?;
        let token = entry.access_token.clone();
        *slot.current.write() = Some(entry);

        debug!(
            fingerprint = %config.fingerprint_tag(),
            auth_mode = config.auth_mode,
            "Token cached"
        );

        Ok(token)
    }

    /// Drop the cached token for `config` (called on an observed 401).
    pub fn invalidate(&self, config: &EffectiveConfig) {
        if let Some(slot) = self.slots.get(&config.fingerprint()) {
            *slot.current.write() = None;
            debug!(fingerprint = %config.fingerprint_tag(), "Token invalidated");
        }
    }

    /// Current cache entry for `config`, if any (diagnostics and tests).
    #[must_use]
    pub fn peek(&self, config: &EffectiveConfig) -> Option<TokenEntry> {
        self.slots
            .get(&config.fingerprint())
            .and_then(|slot| slot.current.read().clone())
    }

    fn slot(&self, config: &EffectiveConfig) -> Arc<Slot> {
        self.slots
            .entry(config.fingerprint())
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone()
    }

    /// Perform one client-credentials exchange.
    async fn exchange(&self, config: &EffectiveConfig) -> Result<TokenEntry, DxError> {
        debug!(
            token_url = %config.token_url,
            fingerprint = %config.fingerprint_tag(),
            "Requesting access token"
        );

        let response = self
            .http
            .post(&config.token_url)
            .header(
                AUTHORIZATION,
                basic_auth_header(&config.client_id, &config.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .timeout(self.exchange_timeout)
            .send()
            .await
            .map_err(|e| {
                DxError::new(
                    ErrorKind::AuthFailed,
                    format!("Token endpoint unreachable: {e}"),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Token exchange rejected");
            return Err(DxError::with_status(
                ErrorKind::AuthFailed,
                format!(
                    "Token exchange failed: {}",
                    body.chars().take(300).collect::<String>()
                ),
                status.as_u16(),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            DxError::new(
                ErrorKind::AuthFailed,
                format!("Malformed token response: {e}"),
            )
        })?;

        let now = Instant::now();
        Ok(TokenEntry {
            access_token: token.access_token,
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            acquired_at: now,
            expires_at: now + Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN)),
        })
    }
}

/// `Basic` authorization header for the client id/secret pair.
fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}
