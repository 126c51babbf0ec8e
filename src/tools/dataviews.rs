//! Data view tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::format::FormatCtx;
use crate::tool::registry::CatalogEntry;
use crate::tool::{
    DxTool, InputSchema, PropertySchema, ToolContext, ToolDescriptor, ToolReply, args,
    reply_error, run_formatted,
};

/// Tools registered by this category.
#[must_use]
pub fn tools() -> Vec<CatalogEntry> {
    vec![
        (module_path!(), Arc::new(GetDataViewMetadata)),
        (module_path!(), Arc::new(ListDataView)),
    ]
}

// ── get_data_view_metadata ────────────────────────────────────────────────

/// Fetch a data view's parameter and field metadata.
pub struct GetDataViewMetadata;

#[async_trait]
impl DxTool for GetDataViewMetadata {
    fn category(&self) -> &'static str {
        "dataviews"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_data_view_metadata",
            "Fetch a data view's metadata: its parameters and queryable fields.",
            InputSchema::new()
                .property("dataViewID", PropertySchema::string("Data view id (D_...)"))
                .require(&["dataViewID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let data_view_id = args::str_arg(&arguments, "dataViewID").unwrap_or_default();
        let fctx = FormatCtx::for_entity(data_view_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Data View Metadata", &e, &fctx),
        };

        run_formatted("Get Data View Metadata", &fctx, || {
            ctx.client.get_data_view_metadata(&config, data_view_id)
        })
        .await
    }
}

// ── list_data_view ────────────────────────────────────────────────────────

/// Query a data view for rows.
pub struct ListDataView;

#[async_trait]
impl DxTool for ListDataView {
    fn category(&self) -> &'static str {
        "dataviews"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "list_data_view",
            "Query a data view for rows. The optional query block selects \
             fields and filters; the paging block bounds the result set.",
            InputSchema::new()
                .property("dataViewID", PropertySchema::string("Data view id (D_...)"))
                .property(
                    "query",
                    PropertySchema::object(
                        "Select/filter/sort block, e.g. {\"select\": [{\"field\": \"Name\"}]}",
                    ),
                )
                .property(
                    "paging",
                    PropertySchema::object("Paging block")
                        .property(
                            "pageNumber",
                            PropertySchema::integer("1-based page to fetch"),
                        )
                        .property("pageSize", PropertySchema::integer("Rows per page"))
                        .property(
                            "maxResultsToFetch",
                            PropertySchema::integer("Cap on total rows when not paging"),
                        ),
                )
                .require(&["dataViewID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let data_view_id = args::str_arg(&arguments, "dataViewID").unwrap_or_default();
        let query = args::value_arg(&arguments, "query").cloned();
        let paging = args::value_arg(&arguments, "paging").cloned();
        let fctx = FormatCtx::for_entity(data_view_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("List Data View", &e, &fctx),
        };

        run_formatted("List Data View", &fctx, || {
            ctx.client
                .list_data_view(&config, data_view_id, query.as_ref(), paging.as_ref())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ToolContext {
        let api = crate::config::ApiConfig {
            base_url: "https://host/prweb/api/dx/v2".to_string(),
            token_url: "https://host/prweb/oauth2/v1/token".to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
        };
        let http = reqwest::Client::new();
        let tokens = Arc::new(crate::auth::TokenCache::new(
            http.clone(),
            std::time::Duration::from_secs(5),
        ));
        let exec =
            crate::dx::HttpExecutor::new(http, tokens, std::time::Duration::from_secs(5));
        ToolContext::new(Arc::new(crate::dx::DxClient::new(exec)), api)
    }

    #[tokio::test]
    async fn list_requires_data_view_id() {
        let reply = ListDataView.execute(json!({}), &context()).await;

        assert!(reply.is_error());
        assert!(reply.text().contains("dataViewID"));
    }

    #[tokio::test]
    async fn list_rejects_non_object_query() {
        let reply = ListDataView
            .execute(json!({"dataViewID": "D_Workers", "query": [1, 2]}), &context())
            .await;

        assert!(reply.is_error());
        assert!(reply.text().contains("query must be a object"));
    }

    #[test]
    fn definitions_validate() {
        for (_, tool) in tools() {
            tool.definition().validate().unwrap();
            assert_eq!(tool.category(), "dataviews");
        }
    }
}
