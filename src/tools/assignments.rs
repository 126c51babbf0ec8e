//! Assignment tools

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
        (module_path!(), Arc::new(GetAssignment)),
        (module_path!(), Arc::new(GetNextAssignment)),
        (module_path!(), Arc::new(GetAssignmentAction)),
        (module_path!(), Arc::new(PerformAssignmentAction)),
    ]
}

// ── get_assignment ────────────────────────────────────────────────────────

/// Fetch one assignment by its full handle.
pub struct GetAssignment;

#[async_trait]
impl DxTool for GetAssignment {
    fn category(&self) -> &'static str {
        "assignments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_assignment",
            "Fetch an assignment by its full handle \
             (e.g. ASSIGN-WORKLIST MYORG-WORK S-1!APPROVAL_FLOW).",
            InputSchema::new()
                .property("assignmentID", PropertySchema::string("Full assignment handle"))
                .property(
                    "viewType",
                    PropertySchema::string("Level of UI metadata to include")
                        .one_of(&["form", "page"])
                        .default_value(Value::String("page".to_string())),
                )
                .require(&["assignmentID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let assignment_id = args::str_arg(&arguments, "assignmentID").unwrap_or_default();
        let view_type = args::str_arg(&arguments, "viewType");
        let fctx = FormatCtx::for_entity(assignment_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Assignment", &e, &fctx),
        };

        run_formatted("Get Assignment", &fctx, || {
            ctx.client.get_assignment(&config, assignment_id, view_type)
        })
        .await
    }
}

// ── get_next_assignment ───────────────────────────────────────────────────

/// Fetch the operator's next work item (get-next-work).
pub struct GetNextAssignment;

#[async_trait]
impl DxTool for GetNextAssignment {
    fn category(&self) -> &'static str {
        "assignments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_next_assignment",
            "Fetch the next assignment from the authenticated operator's \
             worklist. A NOT_FOUND result means the worklist is empty.",
            InputSchema::new().property(
                "viewType",
                PropertySchema::string("Level of UI metadata to include")
                    .one_of(&["form", "page"])
                    .default_value(Value::String("page".to_string())),
            ),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let view_type = args::str_arg(&arguments, "viewType");
        let fctx = FormatCtx::default();

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Next Assignment", &e, &fctx),
        };

        run_formatted("Get Next Assignment", &fctx, || {
            ctx.client.get_next_assignment(&config, view_type)
        })
        .await
    }
}

// ── get_assignment_action ─────────────────────────────────────────────────

/// Fetch an assignment action's form; the response eTag seeds the write.
pub struct GetAssignmentAction;

#[async_trait]
impl DxTool for GetAssignmentAction {
    fn category(&self) -> &'static str {
        "assignments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_assignment_action",
            "Fetch an assignment action's current form and eTag. The eTag can \
             be passed to perform_assignment_action to chain an update.",
            InputSchema::new()
                .property("assignmentID", PropertySchema::string("Full assignment handle"))
                .property("actionID", PropertySchema::string("Flow action name"))
                .property(
                    "viewType",
                    PropertySchema::string("Level of UI metadata to include")
                        .one_of(&["form", "page"])
                        .default_value(Value::String("form".to_string())),
                )
                .require(&["assignmentID", "actionID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let assignment_id = args::str_arg(&arguments, "assignmentID").unwrap_or_default();
        let action_id = args::str_arg(&arguments, "actionID").unwrap_or_default();
        let view_type = args::str_arg(&arguments, "viewType").or(Some("form"));
        let fctx = FormatCtx::for_entity(assignment_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Get Assignment Action", &e, &fctx),
        };

        run_formatted("Get Assignment Action", &fctx, || {
            ctx.client
                .get_assignment_action(&config, assignment_id, action_id, view_type)
        })
        .await
    }
}

// ── perform_assignment_action ─────────────────────────────────────────────

/// Submit an assignment action; auto-fetches the eTag when omitted.
pub struct PerformAssignmentAction;

#[async_trait]
impl DxTool for PerformAssignmentAction {
    fn category(&self) -> &'static str {
        "assignments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "perform_assignment_action",
            "Submit an assignment action with field values, advancing the \
             flow. When eTag is omitted the current one is fetched \
             automatically before the write.",
            InputSchema::new()
                .property("assignmentID", PropertySchema::string("Full assignment handle"))
                .property("actionID", PropertySchema::string("Flow action name"))
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
                .require(&["assignmentID", "actionID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let assignment_id = args::str_arg(&arguments, "assignmentID").unwrap_or_default();
        let action_id = args::str_arg(&arguments, "actionID").unwrap_or_default();
        let fctx = FormatCtx::for_entity(assignment_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Perform Assignment Action", &e, &fctx),
        };

        let entity = EntityRef::AssignmentAction {
            assignment_id,
            action_id,
        };
        let supplied = args::str_arg(&arguments, "eTag");
        let (etag, auto_fetched) = match ctx.resolve_etag(&config, supplied, entity).await {
            Ok(resolved) => resolved,
            Err(e) => return reply_error("Perform Assignment Action", &e, &fctx),
        };

        let fctx = fctx.with_auto_fetched_etag(auto_fetched);
        let update = CaseUpdate {
            content: args::value_arg(&arguments, "content").cloned(),
            page_instructions: args::value_arg(&arguments, "pageInstructions").cloned(),
            attachments: args::value_arg(&arguments, "attachments").cloned(),
        };
        run_formatted("Perform Assignment Action", &fctx, || {
            ctx.client
                .perform_assignment_action(&config, assignment_id, action_id, &etag, update)
        })
        .await
    }
}
