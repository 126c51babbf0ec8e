//! Tool dispatcher
//!
//! Receives `{name, arguments}`, resolves the tool, and returns the tool's
//! reply unchanged. The dispatcher never panics: a tool that escapes its own
//! error envelope is caught here and wrapped as an internal error document.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{DxError, ErrorKind};
use crate::format::{self, FormatCtx};
use crate::tool::{ToolContext, ToolRegistry, ToolReply};

/// Routes tool calls onto registered tools
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, ctx: Arc<ToolContext>) -> Self {
        Self { registry, ctx }
    }

    /// The registry this dispatcher resolves through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatch one invocation.
    pub async fn dispatch(&self, name: &str, arguments: Option<Value>) -> ToolReply {
        let Some(tool) = self.registry.lookup(name) else {
            return ToolReply::Error(format!(
                "Unknown tool: {name}. Available tools: {}",
                self.registry.list_names().join(", ")
            ));
        };

        info!(tool = %name, category = %tool.category, "Dispatching tool call");

        let arguments = arguments.unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        // Tools fold their own failures into the reply; a panic escaping one
        // is a bug, contained here so the process and the transport survive.
        let outcome = std::panic::AssertUnwindSafe(tool.instance.execute(arguments, &self.ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(reply) => reply,
            Err(_) => {
                error!(tool = %name, "Tool panicked during execute");
                let err = DxError::new(
                    ErrorKind::InternalServerError,
                    "The tool failed unexpectedly while executing",
                );
                ToolReply::Content(format::error(&tool.name, &err, &FormatCtx::default()))
            }
        }
    }

    /// Convert a reply into the `tools/call` result payload.
    #[must_use]
    pub fn to_call_result(reply: &ToolReply) -> Value {
        match reply {
            ToolReply::Content(text) => json!({
                "content": [{"type": "text", "text": text}]
            }),
            ToolReply::Error(message) => json!({ "error": message }),
        }
    }
}
