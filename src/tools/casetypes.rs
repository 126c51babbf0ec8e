//! Case type tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::format::FormatCtx;
use crate::tool::registry::CatalogEntry;
use crate::tool::{
    DxTool, InputSchema, ToolContext, ToolDescriptor, ToolReply, args, reply_error,
    run_formatted,
};

/// Tools registered by this category.
#[must_use]
pub fn tools() -> Vec<CatalogEntry> {
    vec![(module_path!(), Arc::new(GetCaseTypes))]
}

/// List the case types the operator can create.
pub struct GetCaseTypes;

#[async_trait]
impl DxTool for GetCaseTypes {
    fn category(&self) -> &'static str {
        "casetypes"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_case_types",
            "List the case types the authenticated operator can create. Use \
             the returned ids with create_case.",
            InputSchema::new(),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let fctx = FormatCtx::default();
        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Case Types", &e, &fctx),
        };

        run_formatted("Get Case Types", &fctx, || {
            ctx.client.get_case_types(&config)
        })
        .await
    }
}
