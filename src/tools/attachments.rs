//! Attachment tools

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DxError, ErrorKind};
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
        (module_path!(), Arc::new(GetCaseAttachments)),
        (module_path!(), Arc::new(AddCaseAttachments)),
        (module_path!(), Arc::new(UploadAttachment)),
        (module_path!(), Arc::new(DeleteAttachment)),
    ]
}

// ── get_case_attachments ──────────────────────────────────────────────────

/// List the attachments of a case.
pub struct GetCaseAttachments;

#[async_trait]
impl DxTool for GetCaseAttachments {
    fn category(&self) -> &'static str {
        "attachments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_case_attachments",
            "List the attachments linked to a case.",
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
            Err(e) => return reply_error("Get Case Attachments", &e, &fctx),
        };

        run_formatted("Get Case Attachments", &fctx, || {
            ctx.client.get_case_attachments(&config, case_id)
        })
        .await
    }
}

// ── add_case_attachments ──────────────────────────────────────────────────

/// Link uploaded files or URLs to a case.
pub struct AddCaseAttachments;

#[async_trait]
impl DxTool for AddCaseAttachments {
    fn category(&self) -> &'static str {
        "attachments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "add_case_attachments",
            "Link attachments to a case: temporary ids from upload_attachment \
             (type File) or external links (type URL).",
            InputSchema::new()
                .property("caseID", PropertySchema::string("Full case handle"))
                .property(
                    "attachments",
                    PropertySchema::array(
                        "Attachment references to link",
                        PropertySchema::object("One attachment reference")
                            .property(
                                "type",
                                PropertySchema::string("Reference kind").one_of(&["File", "URL"]),
                            )
                            .property("category", PropertySchema::string("Attachment category"))
                            .property(
                                "ID",
                                PropertySchema::string("Temporary id from upload_attachment"),
                            )
                            .property("url", PropertySchema::string("Link target for type URL"))
                            .property("name", PropertySchema::string("Display name"))
                            .require(&["type"]),
                    ),
                )
                .require(&["caseID", "attachments"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let case_id = args::str_arg(&arguments, "caseID").unwrap_or_default();
        let attachments = args::value_arg(&arguments, "attachments").cloned().unwrap_or_default();
        let fctx = FormatCtx::for_entity(case_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Add Case Attachments", &e, &fctx),
        };

        run_formatted("Add Case Attachments", &fctx, || {
            ctx.client.add_case_attachments(&config, case_id, &attachments)
        })
        .await
    }
}

// ── upload_attachment ─────────────────────────────────────────────────────

/// Upload one local file as a temporary attachment.
pub struct UploadAttachment;

#[async_trait]
impl DxTool for UploadAttachment {
    fn category(&self) -> &'static str {
        "attachments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "upload_attachment",
            "Upload a local file to the temporary attachment store. The \
             returned id is linked to a case with add_case_attachments.",
            InputSchema::new()
                .property("filePath", PropertySchema::string("Path of the file to upload"))
                .property(
                    "fileName",
                    PropertySchema::string("Name to report upstream; defaults to the file's name"),
                )
                .property(
                    "contentType",
                    PropertySchema::string("MIME type; defaults to application/octet-stream"),
                )
                .require(&["filePath"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let file_path = args::str_arg(&arguments, "filePath").unwrap_or_default();
        let fctx = FormatCtx::for_entity(file_path);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Upload Attachment", &e, &fctx),
        };

        // The file is read fully up front; the handle is closed before any
        // network I/O starts, on success and error paths alike.
        let bytes = match tokio::fs::read(file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = DxError::new(
                    ErrorKind::InvalidArgument,
                    format!("Could not read file '{file_path}': {e}"),
                );
                return reply_error("Upload Attachment", &err, &fctx);
            }
        };

        let file_name = args::str_arg(&arguments, "fileName")
            .map(ToString::to_string)
            .unwrap_or_else(|| {
                Path::new(file_path)
                    .file_name()
                    .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned())
            });
        let content_type =
            args::str_arg(&arguments, "contentType").unwrap_or("application/octet-stream");

        run_formatted("Upload Attachment", &fctx, || {
            ctx.client
                .upload_attachment(&config, &file_name, content_type, bytes)
        })
        .await
    }
}

// ── delete_attachment ─────────────────────────────────────────────────────

/// Remove one attachment by id.
pub struct DeleteAttachment;

#[async_trait]
impl DxTool for DeleteAttachment {
    fn category(&self) -> &'static str {
        "attachments"
    }

    fn definition(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "delete_attachment",
            "Delete an attachment by its link id (see get_case_attachments).",
            InputSchema::new()
                .property("attachmentID", PropertySchema::string("Attachment link id"))
                .require(&["attachmentID"]),
        )
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolReply {
        if let Err(e) = args::validate_args(&arguments, &self.definition().input) {
            return ToolReply::Error(e.message);
        }

        let attachment_id = args::str_arg(&arguments, "attachmentID").unwrap_or_default();
        let fctx = FormatCtx::for_entity(attachment_id);

        let config = match ctx.resolve_config(&arguments) {
            Ok(config) => config,
            Err(e) => return reply_error("Delete Attachment", &e, &fctx),
        };

        run_formatted("Delete Attachment", &fctx, || {
            ctx.client.delete_attachment(&config, attachment_id)
        })
        .await
    }
}
