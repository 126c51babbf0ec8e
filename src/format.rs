//! Response shaper
//!
//! Turns upstream payloads and domain errors into the Markdown documents the
//! transport hands back to the model. The shaper is pure: the same inputs
//! always produce the same text, which keeps it snapshot-testable. Absent
//! fields render as `N/A`, never as "undefined".

use std::fmt::Write as _;

use serde_json::Value;

use crate::dx::DxResponse;
use crate::error::{DxError, ErrorKind};

/// Per-invocation formatting context
#[derive(Debug, Clone, Default)]
pub struct FormatCtx {
    /// Primary entity the operation targeted (case id, assignment id, ...)
    pub entity_id: Option<String>,
    /// True when the write's eTag was obtained by the auto-fetch read
    pub auto_fetched_etag: bool,
}

impl FormatCtx {
    /// Context for an operation on one entity.
    #[must_use]
    pub fn for_entity(id: &str) -> Self {
        Self {
            entity_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    /// Record that the eTag was auto-fetched.
    #[must_use]
    pub fn with_auto_fetched_etag(mut self, fetched: bool) -> Self {
        self.auto_fetched_etag = fetched;
        self
    }
}

/// Render a successful response.
#[must_use]
pub fn success(operation: &str, response: &DxResponse, ctx: &FormatCtx) -> String {
    let mut out = format!("## {operation}\n");

    if let Some(ref id) = ctx.entity_id {
        let _ = writeln!(out, "\n**Target**: `{id}`");
    }

    let data = &response.data;

    if let Some(case_info) = data.get("caseInfo") {
        render_case_info(&mut out, case_info);
        render_assignments(&mut out, case_info.get("assignments"));
        render_available_actions(&mut out, case_info.get("availableActions"));
        render_stages(&mut out, case_info.get("stages"));
    }

    // Stage list endpoint returns stages at the top level
    if data.get("caseInfo").is_none() {
        render_stages(&mut out, data.get("stages"));
    }

    render_data_rows(&mut out, data.get("data"));
    render_attachments(&mut out, data.get("attachments"));
    render_case_types(&mut out, data.get("caseTypes"));
    render_ui_resources(&mut out, data.get("uiResources"));

    if let Some(id) = data.get("ID").and_then(Value::as_str) {
        let _ = writeln!(out, "\n**Returned ID**: `{id}`");
    }

    if let Some(ref etag) = response.etag {
        let _ = writeln!(out, "\n**eTag**: `{etag}` (pass as `eTag` to chain a follow-up write)");
    }

    if ctx.auto_fetched_etag {
        out.push_str("\n_The eTag for this write was fetched automatically before the update._\n");
    }

    out
}

/// Render a domain error.
#[must_use]
pub fn error(operation: &str, err: &DxError, ctx: &FormatCtx) -> String {
    let mut out = format!("## ❌ {operation} failed\n");

    if let Some(ref id) = ctx.entity_id {
        let _ = writeln!(out, "\n**Target**: `{id}`");
    }

    let _ = writeln!(out, "\n**Error**: {}", err.kind);
    let _ = writeln!(out, "**Message**: {}", err.message);
    if let Some(status) = err.status {
        let _ = writeln!(out, "**HTTP status**: {status}");
    }

    if !err.error_details.is_empty() {
        out.push_str("\n### Details\n\n");
        for detail in &err.error_details {
            let text = detail
                .localized_value
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(&detail.message);
            match detail.field.as_deref().filter(|s| !s.is_empty()) {
                Some(field) => {
                    let _ = writeln!(out, "- `{field}`: {text}");
                }
                None => {
                    let _ = writeln!(out, "- {text}");
                }
            }
        }
    }

    out.push_str("\n### How to fix\n\n");
    for step in remediation(err.kind) {
        let _ = writeln!(out, "- {step}");
    }

    out
}

/// Kind-specific remediation guidance.
fn remediation(kind: ErrorKind) -> &'static [&'static str] {
    match kind {
        ErrorKind::InvalidArgument => &[
            "Check the tool's input schema via tools/list.",
            "Supply every required field and keep enum values exact.",
        ],
        ErrorKind::ConfigInvalid => &[
            "The server is missing connection settings; verify base URL, client id, and client secret.",
            "If you passed sessionCredentials, make sure every overridden field is a non-empty string.",
        ],
        ErrorKind::AuthFailed => &[
            "The OAuth2 client-credentials exchange was rejected.",
            "Verify the client id/secret pair and that the token endpoint is reachable.",
        ],
        ErrorKind::Unauthorized => &[
            "The access token was refused even after a refresh.",
            "The registered client may lack access to this API; check its OAuth configuration.",
        ],
        ErrorKind::Forbidden => &[
            "The authenticated operator is not allowed to perform this operation.",
            "Check the operator's access role for the target case type.",
        ],
        ErrorKind::NotFound => &[
            "Verify the identifier, including the full handle prefix (e.g. MYORG-WORK C-123).",
            "For next-assignment calls this can simply mean the worklist is empty.",
        ],
        ErrorKind::BadRequest => &[
            "The upstream rejected the request shape; re-check field names and value formats.",
        ],
        ErrorKind::PreconditionFailed => &[
            "The record changed since the eTag was read.",
            "Re-read the action (or omit eTag to auto-fetch) and retry the write with the fresh value.",
        ],
        ErrorKind::Conflict => &[
            "The operation conflicts with the record's current state; re-read the case before retrying.",
        ],
        ErrorKind::ValidationFail => &[
            "A business rule rejected the submitted values; see the details above.",
            "Correct the flagged fields and submit again.",
        ],
        ErrorKind::Locked => &[
            "Another operator holds the lock on this record.",
            "Wait for the lock to release or ask the lock holder to discard their changes.",
        ],
        ErrorKind::FailedDependency => &[
            "A dependent upstream operation failed first; inspect the details above.",
        ],
        ErrorKind::InternalServerError => &[
            "The upstream reported an internal failure; retry later.",
            "If the failure persists, inspect the upstream service's logs.",
        ],
        ErrorKind::ConnectionError => &[
            "The upstream could not be reached; verify the base URL and network path.",
        ],
        ErrorKind::Timeout => &[
            "The call exceeded its deadline; retry, or raise the configured request timeout.",
        ],
        ErrorKind::EtagFetchFailed => &[
            "The preliminary read used to obtain the eTag failed, so the write was not attempted.",
            "Fix the read error above, or supply an eTag explicitly.",
        ],
        ErrorKind::EtagMissing => &[
            "The read succeeded but returned no eTag; the action may not be open for this record.",
            "Verify the action id and the record's current stage.",
        ],
    }
}

// ── Section renderers ─────────────────────────────────────────────────────

fn text_or_na(value: Option<&Value>) -> String {
    value
        .and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "N/A".to_string())
}

fn render_case_info(out: &mut String, case_info: &Value) {
    out.push_str("\n### Case\n\n");
    let _ = writeln!(out, "- **ID**: {}", text_or_na(case_info.get("ID")));
    let _ = writeln!(
        out,
        "- **Type**: {}",
        text_or_na(case_info.get("caseTypeName"))
    );
    let _ = writeln!(out, "- **Status**: {}", text_or_na(case_info.get("status")));
    let _ = writeln!(
        out,
        "- **Stage**: {}",
        text_or_na(case_info.get("stageLabel"))
    );
    let _ = writeln!(
        out,
        "- **Urgency**: {}",
        text_or_na(case_info.get("urgency"))
    );
}

fn render_assignments(out: &mut String, assignments: Option<&Value>) {
    let Some(list) = assignments.and_then(Value::as_array) else {
        return;
    };
    if list.is_empty() {
        return;
    }

    out.push_str("\n### Open assignments\n\n");
    for assignment in list {
        let _ = writeln!(
            out,
            "- `{}` — {} (assigned to {})",
            text_or_na(assignment.get("ID")),
            text_or_na(assignment.get("name")),
            text_or_na(assignment.get("assigneeInfo").and_then(|a| a.get("name"))),
        );
    }
}

fn render_available_actions(out: &mut String, actions: Option<&Value>) {
    let Some(list) = actions.and_then(Value::as_array) else {
        return;
    };
    if list.is_empty() {
        return;
    }

    out.push_str("\n### Available actions\n\n");
    for action in list {
        let _ = writeln!(
            out,
            "- `{}` — {}",
            text_or_na(action.get("ID")),
            text_or_na(action.get("name")),
        );
    }
}

fn render_stages(out: &mut String, stages: Option<&Value>) {
    let Some(list) = stages.and_then(Value::as_array) else {
        return;
    };
    if list.is_empty() {
        return;
    }

    out.push_str("\n### Stage progression\n\n");
    for stage in list {
        let visited = stage
            .get("visited_status")
            .or_else(|| stage.get("visitedStatus"))
            .and_then(Value::as_str)
            .unwrap_or("future");
        let _ = writeln!(
            out,
            "- {} — {visited}",
            text_or_na(stage.get("name")),
        );
    }
}

fn render_data_rows(out: &mut String, rows: Option<&Value>) {
    let Some(list) = rows.and_then(Value::as_array) else {
        return;
    };

    let _ = writeln!(out, "\n### Results ({} rows)\n", list.len());
    // Render at most a screenful; the caller can page for more.
    for row in list.iter().take(25) {
        let _ = writeln!(out, "- {}", compact_row(row));
    }
    if list.len() > 25 {
        let _ = writeln!(out, "- … {} more rows (use paging to fetch them)", list.len() - 25);
    }
}

fn compact_row(row: &Value) -> String {
    match row {
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .take(6)
                .map(|(k, v)| format!("{k}: {}", text_or_na(Some(v))))
                .collect();
            fields.join(", ")
        }
        other => text_or_na(Some(other)),
    }
}

fn render_attachments(out: &mut String, attachments: Option<&Value>) {
    let Some(list) = attachments.and_then(Value::as_array) else {
        return;
    };

    let _ = writeln!(out, "\n### Attachments ({})\n", list.len());
    for attachment in list {
        let _ = writeln!(
            out,
            "- `{}` — {} ({})",
            text_or_na(attachment.get("ID")),
            text_or_na(attachment.get("name").or_else(|| attachment.get("fileName"))),
            text_or_na(attachment.get("category").or_else(|| attachment.get("type"))),
        );
    }
}

fn render_case_types(out: &mut String, case_types: Option<&Value>) {
    let Some(list) = case_types.and_then(Value::as_array) else {
        return;
    };

    out.push_str("\n### Case types\n\n");
    for case_type in list {
        let _ = writeln!(
            out,
            "- `{}` — {}",
            text_or_na(case_type.get("ID")),
            text_or_na(case_type.get("name")),
        );
    }
}

fn render_ui_resources(out: &mut String, ui: Option<&Value>) {
    let Some(ui) = ui else { return };

    let root_type = ui
        .pointer("/root/type")
        .and_then(Value::as_str)
        .unwrap_or("N/A");
    let view_count = ui
        .pointer("/resources/views")
        .and_then(Value::as_object)
        .map_or(0, serde_json::Map::len);
    let _ = writeln!(
        out,
        "\n**UI resources**: root component {root_type}, {view_count} view(s)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response(data: Value, etag: Option<&str>) -> DxResponse {
        DxResponse {
            status: 200,
            data,
            etag: etag.map(ToString::to_string),
        }
    }

    // ── Success rendering ─────────────────────────────────────────────

    #[test]
    fn success_starts_with_operation_heading() {
        let text = success("Get Case", &response(json!({}), None), &FormatCtx::default());
        assert!(text.starts_with("## Get Case\n"), "text: {text}");
    }

    #[test]
    fn success_renders_case_info_with_na_for_absent_fields() {
        let data = json!({
            "caseInfo": {"ID": "MYORG-WORK C-55", "status": "Open"}
        });
        let text = success("Get Case", &response(data, None), &FormatCtx::default());

        assert!(text.contains("- **ID**: MYORG-WORK C-55"));
        assert!(text.contains("- **Status**: Open"));
        // caseTypeName and urgency were absent
        assert!(text.contains("- **Type**: N/A"));
        assert!(text.contains("- **Urgency**: N/A"));
        assert!(!text.contains("undefined"));
    }

    #[test]
    fn success_renders_etag_and_auto_fetch_note() {
        let ctx = FormatCtx::for_entity("ASSIGN-WORKLIST A-1").with_auto_fetched_etag(true);
        let text = success("Perform Assignment Action", &response(json!({}), Some("v9")), &ctx);

        assert!(text.contains("**Target**: `ASSIGN-WORKLIST A-1`"));
        assert!(text.contains("**eTag**: `v9`"));
        assert!(text.contains("fetched automatically"));
    }

    #[test]
    fn success_renders_available_actions_and_assignments() {
        let data = json!({
            "caseInfo": {
                "ID": "C-1",
                "availableActions": [{"ID": "Edit", "name": "Edit details"}],
                "assignments": [{
                    "ID": "ASSIGN-WORKLIST A-1",
                    "name": "Review",
                    "assigneeInfo": {"name": "Ada"}
                }]
            }
        });
        let text = success("Get Case", &response(data, None), &FormatCtx::default());

        assert!(text.contains("### Available actions"));
        assert!(text.contains("`Edit` — Edit details"));
        assert!(text.contains("### Open assignments"));
        assert!(text.contains("assigned to Ada"));
    }

    #[test]
    fn success_renders_data_rows_with_cap() {
        let rows: Vec<Value> = (0..30).map(|i| json!({"Name": format!("row{i}")})).collect();
        let text = success(
            "List Data View",
            &response(json!({"data": rows}), None),
            &FormatCtx::default(),
        );

        assert!(text.contains("### Results (30 rows)"));
        assert!(text.contains("row0"));
        assert!(text.contains("… 5 more rows"));
    }

    // ── Determinism ───────────────────────────────────────────────────

    #[test]
    fn success_is_deterministic() {
        let data = json!({
            "caseInfo": {"ID": "C-2", "status": "Pending-Review"},
            "uiResources": {"root": {"type": "reference"}}
        });
        let ctx = FormatCtx::for_entity("C-2");

        let first = success("Get Case", &response(data.clone(), Some("e1")), &ctx);
        let second = success("Get Case", &response(data, Some("e1")), &ctx);
        assert_eq!(first, second);
    }

    // ── Error rendering ───────────────────────────────────────────────

    #[test]
    fn error_starts_with_cross_heading_and_names_kind() {
        let err = DxError::with_status(ErrorKind::PreconditionFailed, "eTag mismatch", 412);
        let text = error("Perform Case Action", &err, &FormatCtx::default());

        assert!(text.starts_with("## ❌ Perform Case Action failed\n"), "text: {text}");
        assert!(text.contains("**Error**: PRECONDITION_FAILED"));
        assert!(text.contains("**Message**: eTag mismatch"));
        assert!(text.contains("**HTTP status**: 412"));
        // Remediation points at the re-read
        assert!(text.contains("Re-read the action"));
    }

    #[test]
    fn error_renders_error_details() {
        let mut err = DxError::with_status(ErrorKind::ValidationFail, "Validation failed", 422);
        err.error_details = vec![
            crate::error::ErrorDetail {
                message: "Error_Required".to_string(),
                localized_value: Some("Amount is required".to_string()),
                field: Some(".Amount".to_string()),
            },
            crate::error::ErrorDetail {
                message: "Error_Range".to_string(),
                localized_value: None,
                field: None,
            },
        ];
        let text = error("Perform Assignment Action", &err, &FormatCtx::default());

        assert!(text.contains("### Details"));
        assert!(text.contains("- `.Amount`: Amount is required"));
        assert!(text.contains("- Error_Range"));
    }

    #[test]
    fn every_kind_has_remediation() {
        let kinds = [
            ErrorKind::InvalidArgument,
            ErrorKind::ConfigInvalid,
            ErrorKind::AuthFailed,
            ErrorKind::Unauthorized,
            ErrorKind::Forbidden,
            ErrorKind::NotFound,
            ErrorKind::BadRequest,
            ErrorKind::PreconditionFailed,
            ErrorKind::Conflict,
            ErrorKind::ValidationFail,
            ErrorKind::Locked,
            ErrorKind::FailedDependency,
            ErrorKind::InternalServerError,
            ErrorKind::ConnectionError,
            ErrorKind::Timeout,
            ErrorKind::EtagFetchFailed,
            ErrorKind::EtagMissing,
        ];
        for kind in kinds {
            let err = DxError::new(kind, "x");
            let text = error("Op", &err, &FormatCtx::default());
            assert!(text.contains("### How to fix"), "kind {kind} lacks remediation");
        }
    }

    #[test]
    fn error_is_deterministic() {
        let err = DxError::with_status(ErrorKind::Locked, "Held by ada", 423);
        let ctx = FormatCtx::for_entity("C-9");
        assert_eq!(error("Op", &err, &ctx), error("Op", &err, &ctx));
    }
}
