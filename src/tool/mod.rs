//! Tool contract
//!
//! Every tool is a stateless value implementing [`DxTool`]; there is no
//! inheritance tree. Shared behavior — argument validation, configuration
//! resolution, the error envelope — lives in this module and in [`args`],
//! consumed by composition.
//!
//! Tools never return an `Err` to the dispatcher: every failure becomes a
//! [`ToolReply`], either the `{error}` envelope (pre-validation) or a
//! Markdown error document (everything after validation).

pub mod args;
pub mod registry;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::dx::{DxClient, DxResponse, EntityRef, fetch_etag};
use crate::error::DxError;
use crate::format::{self, FormatCtx};
use crate::session::{self, EffectiveConfig, SessionCredentials};

pub use registry::{RegisteredTool, ToolRegistry};
pub use schema::{InputSchema, PropertySchema, ToolDescriptor};

/// Outcome of one tool invocation, as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolReply {
    /// Normal tool return: a Markdown document (success or shaped error)
    Content(String),
    /// Validation failure: the `{error: …}` envelope, never attempted upstream
    Error(String),
}

impl ToolReply {
    /// True for the `{error}` envelope.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The text payload regardless of envelope (test convenience).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Content(s) | Self::Error(s) => s,
        }
    }
}

/// Shared dependencies handed to every tool invocation.
pub struct ToolContext {
    /// The DX client facade
    pub client: Arc<DxClient>,
    /// Process-default API identity
    pub defaults: ApiConfig,
}

impl ToolContext {
    /// Create a context.
    #[must_use]
    pub fn new(client: Arc<DxClient>, defaults: ApiConfig) -> Self {
        Self { client, defaults }
    }

    /// Resolve the effective configuration for this call, honoring an
    /// optional `sessionCredentials` argument.
    ///
    /// # Errors
    ///
    /// `CONFIG_INVALID` when the merge leaves a required field empty or the
    /// override cannot be parsed.
    pub fn resolve_config(&self, arguments: &Value) -> Result<EffectiveConfig, DxError> {
        let overrides: Option<SessionCredentials> = match arguments.get("sessionCredentials") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|e| {
                DxError::new(
                    crate::error::ErrorKind::ConfigInvalid,
                    format!("sessionCredentials is malformed: {e}"),
                )
            })?),
        };

        let config = session::resolve(&self.defaults, overrides.as_ref())?;
        debug!(
            session = %config.session_id,
            auth_mode = config.auth_mode,
            config_source = config.config_source,
            "Resolved invocation configuration"
        );
        Ok(config)
    }

    /// Resolve the eTag for a write: use the caller's value when supplied,
    /// otherwise auto-fetch through the entity's read endpoint on the same
    /// configuration. The boolean reports whether a fetch happened.
    ///
    /// # Errors
    ///
    /// `ETAG_FETCH_FAILED` or `ETAG_MISSING` from the auto-fetch path; the
    /// write must not proceed in either case.
    pub async fn resolve_etag(
        &self,
        config: &EffectiveConfig,
        supplied: Option<&str>,
        entity: EntityRef<'_>,
    ) -> Result<(String, bool), DxError> {
        if let Some(etag) = crate::dx::etag::normalize_etag(supplied) {
            return Ok((etag, false));
        }
        let fetched = fetch_etag(&self.client, config, entity).await?;
        Ok((fetched, true))
    }
}

/// The uniform tool interface.
#[async_trait]
pub trait DxTool: Send + Sync {
    /// Category tag grouping related tools (matches the module name).
    fn category(&self) -> &'static str;

    /// The immutable descriptor published via `tools/list`.
    fn definition(&self) -> ToolDescriptor;

    /// Run the tool. Must not return errors to the dispatcher; all failure
    /// is folded into the reply.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply;
}

/// Run `call` and fold its outcome into a Markdown reply.
///
/// Success goes through the shaper's success renderer, domain errors through
/// its error renderer. Both are normal tool returns as far as the transport
/// is concerned.
pub async fn run_formatted<F, Fut>(operation: &str, fctx: &FormatCtx, call: F) -> ToolReply
where
    F: FnOnce() -> Fut + Send,
    Fut: std::future::Future<Output = Result<DxResponse, DxError>> + Send,
{
    match call().await {
        Ok(response) => ToolReply::Content(format::success(operation, &response, fctx)),
        Err(err) => {
            debug!(operation, kind = %err.kind, "Invocation failed");
            ToolReply::Content(format::error(operation, &err, fctx))
        }
    }
}

/// Fold an error that occurred before the main call (config resolution,
/// eTag auto-fetch) into the same Markdown error envelope.
#[must_use]
pub fn reply_error(operation: &str, err: &DxError, fctx: &FormatCtx) -> ToolReply {
    ToolReply::Content(format::error(operation, err, fctx))
}
