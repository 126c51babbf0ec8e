//! Case tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dx::EntityRef;
use crate::dx::client::CaseUpdate;
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
        (module_path!(), Arc::new(GetCase)),
        (module_path!(), Arc::new(CreateCase)),
        (module_path!(), Arc::new(GetCaseStages)),
        (module_path!(), Arc::new(GetCaseAction)),
        (module_path!(), Arc::new(PerformCaseAction)),
    ]
}

fn case_update_from(arguments: &Value) -> CaseUpdate {
    CaseUpdate {
        content: args::value_arg(arguments, "content").cloned(),
        page_instructions: args::value_arg(arguments, "pageInstructions").cloned(),
        attachments: args::value_arg(arguments, "attachments").cloned(),
    }
}

// ── get_case ──────────────────────────────────────────────────────────────

/// Fetch one case by its full handle.
pub struct GetCase;

#[async_trait]
impl DxTool for GetCase {
    fn category(&self) -> &'static str {
        "cases"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_case",
            "Fetch a case by its full handle (e.g. MYORG-SERVICES-WORK S-293001), \
             including status, stage, open assignments, and available actions.",
            InputSchema::new()
                .property("caseID", PropertySchema::string("Full case handle"))
                .property(
                    "viewType",
                    PropertySchema::string("Level of UI metadata to include")
                        .one_of(&["form", "page", "none"])
                        .default_value(Value::String("none".to_string())),
                )
                .require(&["caseID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_id = args::str_arg(&arguments, "caseID").unwrap_or_default();
        let view_type = args::str_arg(&arguments, "viewType");
        let fctx = FormatCtx::for_entity(case_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Case", &e, &fctx),
        };

        run_formatted("Get Case", &fctx, || {
            ctx.client.get_case(&config, case_id, view_type)
        })
        .await
    }
}

// ── create_case ───────────────────────────────────────────────────────────

/// Create a new case of a given type.
pub struct CreateCase;

#[async_trait]
impl DxTool for CreateCase {
    fn category(&self) -> &'static str {
        "cases"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "create_case",
            "Create a new case of the given case type, optionally seeding field values.",
            InputSchema::new()
                .property(
                    "caseTypeID",
                    PropertySchema::string("Case type id (see get_case_types)"),
                )
                .property(
                    "processID",
                    PropertySchema::string("Starting process; defaults to the type's starter"),
                )
                .property(
                    "content",
                    PropertySchema::object("Initial field values keyed by property name"),
                )
                .property(
                    "pageInstructions",
                    PropertySchema::array(
                        "Embedded-page list operations",
                        PropertySchema::object("One page instruction"),
                    ),
                )
                .property(
                    "attachments",
                    PropertySchema::array(
                        "Attachments to link at creation",
                        PropertySchema::object("One attachment reference"),
                    ),
                )
                .require(&["caseTypeID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_type_id = args::str_arg(&arguments, "caseTypeID").unwrap_or_default();
        let process_id = args::str_arg(&arguments, "processID");
        let fctx = FormatCtx::for_entity(case_type_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Create Case", &e, &fctx),
        };

        let update = case_update_from(&arguments);
        run_formatted("Create Case", &fctx, || {
            ctx.client
                .create_case(&config, case_type_id, process_id, update)
        })
        .await
    }
}

// ── get_case_stages ───────────────────────────────────────────────────────

/// List a case's stages with their visited status.
pub struct GetCaseStages;

#[async_trait]
impl DxTool for GetCaseStages {
    fn category(&self) -> &'static str {
        "cases"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_case_stages",
            "List the stages of a case and which of them have been visited.",
            InputSchema::new()
                .property("caseID", PropertySchema::string("Full case handle"))
                .require(&["caseID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_id = args::str_arg(&arguments, "caseID").unwrap_or_default();
        let fctx = FormatCtx::for_entity(case_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Case Stages", &e, &fctx),
        };

        run_formatted("Get Case Stages", &fctx, || {
            ctx.client.get_case_stages(&config, case_id)
        })
        .await
    }
}

// ── get_case_action ───────────────────────────────────────────────────────

/// Fetch a case-wide action's form; the response eTag seeds the write.
pub struct GetCaseAction;

#[async_trait]
impl DxTool for GetCaseAction {
    fn category(&self) -> &'static str {
        "cases"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_case_action",
            "Fetch a case-wide action's current form and eTag. The eTag can be \
             passed to perform_case_action to chain an update.",
            InputSchema::new()
                .property("caseID", PropertySchema::string("Full case handle"))
                .property("actionID", PropertySchema::string("Case action name"))
                .property(
                    "viewType",
                    PropertySchema::string("Level of UI metadata to include")
                        .one_of(&["form", "page"])
                        .default_value(Value::String("form".to_string())),
                )
                .require(&["caseID", "actionID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_id = args::str_arg(&arguments, "caseID").unwrap_or_default();
        let action_id = args::str_arg(&arguments, "actionID").unwrap_or_default();
        let view_type = args::str_arg(&arguments, "viewType").or(Some("form"));
        let fctx = FormatCtx::for_entity(case_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Case Action", &e, &fctx),
        };

        run_formatted("Get Case Action", &fctx, || {
            ctx.client
                .get_case_action(&config, case_id, action_id, view_type)
        })
        .await
    }
}

// ── perform_case_action ───────────────────────────────────────────────────

/// Perform a case-wide action; auto-fetches the eTag when omitted.
pub struct PerformCaseAction;

#[async_trait]
impl DxTool for PerformCaseAction {
    fn category(&self) -> &'static str {
        "cases"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "perform_case_action",
            "Perform a case-wide action, submitting field values. When eTag is \
             omitted the current one is fetched automatically before the write.",
            InputSchema::new()
                .property("caseID", PropertySchema::string("Full case handle"))
                .property("actionID", PropertySchema::string("Case action name"))
                .property(
                    "eTag",
                    PropertySchema::string(
                        "Version token from a prior read; omit to auto-fetch",
                    ),
                )
                .property(
                    "content",
                    PropertySchema::object("Field values keyed by property name"),
                )
                .property(
                    "pageInstructions",
                    PropertySchema::array(
                        "Embedded-page list operations",
                        PropertySchema::object("One page instruction"),
                    ),
                )
                .property(
                    "attachments",
                    PropertySchema::array(
                        "Attachments to link as part of this action",
                        PropertySchema::object("One attachment reference"),
                    ),
                )
                .require(&["caseID", "actionID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_id = args::str_arg(&arguments, "caseID").unwrap_or_default();
        let action_id = args::str_arg(&arguments, "actionID").unwrap_or_default();
        let fctx = FormatCtx::for_entity(case_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Perform Case Action", &e, &fctx),
        };

        let entity = EntityRef::CaseAction { case_id, action_id };
        let supplied = args::str_arg(&arguments, "eTag");
        let (etag, auto_fetched) = match ctx.resolve_etag(&config, supplied, entity).await {
            Ok(resolved) => resolved,
            Err(e) => return reply_error("Perform Case Action", &e, &fctx),
        };

        let fctx = fctx.with_auto_fetched_etag(auto_fetched);
        let update = case_update_from(&arguments);
        run_formatted("Perform Case Action", &fctx, || {
            ctx.client
                .perform_case_action(&config, case_id, action_id, &etag, update)
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
    async fn get_case_requires_case_id() {
        let reply = GetCase.execute(json!({}), &context()).await;

        assert!(reply.is_error());
        assert!(reply.text().contains("caseID"));
    }

    #[tokio::test]
    async fn get_case_rejects_bad_view_type() {
        let reply = GetCase
            .execute(json!({"caseID": "C-1", "viewType": "xml"}), &context())
            .await;

        assert!(reply.is_error());
        assert!(reply.text().contains("viewType must be one of form, page, none"));
    }

    #[tokio::test]
    async fn create_case_requires_case_type() {
        let reply = CreateCase.execute(json!({}), &context()).await;

        assert!(reply.is_error());
        assert!(reply.text().contains("caseTypeID"));
    }

    #[tokio::test]
    async fn perform_case_action_requires_both_ids() {
        let reply = PerformCaseAction
            .execute(json!({"caseID": "C-1"}), &context())
            .await;

        assert!(reply.is_error());
        assert!(reply.text().contains("actionID"));
    }

    #[test]
    fn etag_is_optional_in_the_write_schema() {
        let descriptor = PerformCaseAction.definition();
        assert!(!descriptor.input.required.contains(&"eTag".to_string()));
        assert!(descriptor.input.get("eTag").is_some());
    }

    #[test]
    fn definitions_validate() {
        for (_, tool) in tools() {
            tool.definition().validate().unwrap();
            assert_eq!(tool.category(), "cases");
        }
    }
}
