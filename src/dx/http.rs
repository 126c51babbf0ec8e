//! HTTP executor
//!
//! Issues one REST call with bearer auth. On a `401` the cached token is
//! invalidated, a fresh exchange is forced, and the request is reissued
//! exactly once; a second `401` surfaces as `UNAUTHORIZED`. Nothing else is
//! retried here — the upstream owns its own idempotency guarantees and the
//! core never replays writes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, IF_MATCH};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenCache;
use crate::error::{DxError, ErrorKind};
use crate::session::EffectiveConfig;

use super::request::{DxBody, DxRequest};

/// A successful upstream response
#[derive(Debug, Clone)]
pub struct DxResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body (`null` for empty bodies)
    pub data: Value,
    /// `eTag` response header, surfaced for optimistic-concurrency chaining
    pub etag: Option<String>,
}

/// Executes [`DxRequest`]s with auth and the single-retry 401 policy
pub struct HttpExecutor {
    http: Client,
    tokens: Arc<TokenCache>,
    request_timeout: Duration,
}

impl HttpExecutor {
    /// Create an executor sharing the given pooled client and token cache.
    #[must_use]
    pub fn new(http: Client, tokens: Arc<TokenCache>, request_timeout: Duration) -> Self {
        Self {
            http,
            tokens,
            request_timeout,
        }
    }

    /// The token cache this executor authenticates through.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Issue `request` under `config`.
    ///
    /// # Errors
    ///
    /// Any non-2xx upstream status maps through the status table to a
    /// [`DxError`]; transport failures map to `TIMEOUT` or
    /// `CONNECTION_ERROR`; auth failures to `AUTH_FAILED`/`UNAUTHORIZED`.
    pub async fn call(
        &self,
        config: &EffectiveConfig,
        request: &DxRequest,
    ) -> Result<DxResponse, DxError> {
        let token = self.tokens.acquire(config).await?;
        let response = self.send_once(config, request, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return finish(response).await;
        }

        // One refresh, one reissue. The invalidation empties the slot, so
        // the acquire below performs (or joins) a fresh exchange.
        debug!(request = %request.label(), "401 received, refreshing token");
        self.tokens.invalidate(config);
        let token = self.tokens.acquire(config).await?;
        let response = self.send_once(config, request, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let status = response.status().as_u16();
            let body = response.bytes().await.unwrap_or_default();
            warn!(request = %request.label(), "401 persisted after token refresh");
            let mut err = DxError::from_response(status, &body);
            err.kind = ErrorKind::Unauthorized;
            err.message = format!(
                "Request remained unauthorized after a token refresh: {}",
                err.message
            );
            return Err(err);
        }

        finish(response).await
    }

    /// Build and send the request once.
    async fn send_once(
        &self,
        config: &EffectiveConfig,
        request: &DxRequest,
        token: &str,
    ) -> Result<reqwest::Response, DxError> {
        let url = build_url(&config.base_url, request)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout);

        if let Some(ref etag) = request.if_match {
            builder = builder.header(IF_MATCH, etag);
        }

        builder = match request.body {
            Some(DxBody::Json(ref body)) => builder.json(body),
            Some(DxBody::Multipart {
                ref file_name,
                ref content_type,
                ref bytes,
            }) => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|e| {
                        DxError::new(
                            ErrorKind::InvalidArgument,
                            format!("Invalid attachment content type '{content_type}': {e}"),
                        )
                    })?;
                builder.multipart(reqwest::multipart::Form::new().part("file", part))
            }
            None => builder,
        };

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DxError::new(
                    ErrorKind::Timeout,
                    format!("Request exceeded its {:?} deadline", self.request_timeout),
                )
            } else {
                DxError::new(ErrorKind::ConnectionError, format!("Request failed: {e}"))
            }
        })
    }
}

/// Assemble the full URL: base + encoded path segments + query string.
fn build_url(base_url: &str, request: &DxRequest) -> Result<Url, DxError> {
    let mut url = Url::parse(base_url).map_err(|e| {
        DxError::new(
            ErrorKind::ConfigInvalid,
            format!("Invalid base URL '{base_url}': {e}"),
        )
    })?;

    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            DxError::new(
                ErrorKind::ConfigInvalid,
                format!("Base URL '{base_url}' cannot carry a path"),
            )
        })?;
        // `push` percent-encodes each segment, which is what keeps case ids
        // with spaces ("MYORG-WORK T-1") intact on the wire.
        segments.pop_if_empty();
        for segment in &request.path {
            segments.push(segment);
        }
    }

    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&request.query);
    }

    Ok(url)
}

/// Convert a raw response into a [`DxResponse`] or a mapped [`DxError`].
async fn finish(response: reqwest::Response) -> Result<DxResponse, DxError> {
    let status = response.status().as_u16();
    let etag = response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let body = response.bytes().await.map_err(|e| {
        DxError::new(
            ErrorKind::ConnectionError,
            format!("Failed to read response body: {e}"),
        )
    })?;

    match ErrorKind::from_status(status) {
        None => {
            let data = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body).unwrap_or(Value::Null)
            };
            Ok(DxResponse { status, data, etag })
        }
        Some(_) => Err(DxError::from_response(status, &body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    // ── URL building ──────────────────────────────────────────────────

    #[test]
    fn build_url_joins_segments_and_query() {
        let req = DxRequest::get(&["cases", "MYORG-WORK C-123"]).query("viewType", "page");
        let url = build_url("https://host/prweb/api/dx/v2", &req).unwrap();

        assert_eq!(
            url.as_str(),
            "https://host/prweb/api/dx/v2/cases/MYORG-WORK%20C-123?viewType=page"
        );
    }

    #[test]
    fn build_url_encodes_punctuation_in_segments() {
        let req = DxRequest::get(&["assignments", "ASSIGN-WORKLIST A/B#1"]);
        let url = build_url("https://host/api", &req).unwrap();

        // '/' and '#' inside a segment must not split the path
        assert_eq!(
            url.as_str(),
            "https://host/api/assignments/ASSIGN-WORKLIST%20A%2FB%231"
        );
    }

    #[test]
    fn build_url_handles_trailing_slash_base() {
        let req = DxRequest::get(&["casetypes"]);
        let url = build_url("https://host/prweb/api/dx/v2/", &req).unwrap();

        assert_eq!(url.as_str(), "https://host/prweb/api/dx/v2/casetypes");
    }

    #[test]
    fn build_url_rejects_invalid_base() {
        let req = DxRequest::get(&["cases"]);
        let err = build_url("not a url", &req).unwrap_err();

        assert_eq!(err.kind, ErrorKind::ConfigInvalid);
    }

    #[test]
    fn request_method_carries_through() {
        let req = DxRequest::delete(&["attachments", "LINK-1"]);
        assert_eq!(req.method, Method::DELETE);
    }
}
