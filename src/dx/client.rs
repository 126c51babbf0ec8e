//! DX client facade
//!
//! One method per upstream endpoint family. The facade only maps calls to
//! HTTP: argument validation happens in the tool layer before a method is
//! reached, and Markdown formatting happens after it returns.

use serde_json::{Map, Value, json};

use crate::error::DxError;
use crate::session::EffectiveConfig;

use super::http::{DxResponse, HttpExecutor};
use super::request::DxRequest;

/// Fields shared by case-mutating request bodies.
#[derive(Debug, Clone, Default)]
pub struct CaseUpdate {
    /// Field values keyed by property name
    pub content: Option<Value>,
    /// Embedded-page list operations
    pub page_instructions: Option<Value>,
    /// Attachments to link as part of the write
    pub attachments: Option<Value>,
}

impl CaseUpdate {
    fn into_body(self) -> Value {
        let mut body = Map::new();
        if let Some(content) = self.content {
            body.insert("content".to_string(), content);
        }
        if let Some(pi) = self.page_instructions {
            body.insert("pageInstructions".to_string(), pi);
        }
        if let Some(att) = self.attachments {
            body.insert("attachments".to_string(), att);
        }
        Value::Object(body)
    }
}

/// Facade over the DX REST endpoint families
pub struct DxClient {
    exec: HttpExecutor,
}

impl DxClient {
    /// Wrap an executor.
    #[must_use]
    pub fn new(exec: HttpExecutor) -> Self {
        Self { exec }
    }

    /// The underlying executor (shared token cache access).
    #[must_use]
    pub fn executor(&self) -> &HttpExecutor {
        &self.exec
    }

    // ── Cases ─────────────────────────────────────────────────────────

    /// `GET cases/{caseID}`
    pub async fn get_case(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
        view_type: Option<&str>,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["cases", case_id]).query_opt("viewType", view_type);
        self.exec.call(config, &req).await
    }

    /// `POST cases`
    pub async fn create_case(
        &self,
        config: &EffectiveConfig,
        case_type_id: &str,
        process_id: Option<&str>,
        update: CaseUpdate,
    ) -> Result<DxResponse, DxError> {
        let mut body = update.into_body();
        body["caseTypeID"] = json!(case_type_id);
        if let Some(pid) = process_id {
            body["processID"] = json!(pid);
        }

        let req = DxRequest::post(&["cases"]).json(body);
        self.exec.call(config, &req).await
    }

    /// `GET cases/{caseID}/stages`
    pub async fn get_case_stages(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["cases", case_id, "stages"]);
        self.exec.call(config, &req).await
    }

    /// `GET cases/{caseID}/actions/{actionID}` — the response `eTag` seeds a
    /// subsequent [`DxClient::perform_case_action`].
    pub async fn get_case_action(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
        action_id: &str,
        view_type: Option<&str>,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["cases", case_id, "actions", action_id])
            .query_opt("viewType", view_type);
        self.exec.call(config, &req).await
    }

    /// `PATCH cases/{caseID}/actions/{actionID}` with `If-Match`
    pub async fn perform_case_action(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
        action_id: &str,
        etag: &str,
        update: CaseUpdate,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::patch(&["cases", case_id, "actions", action_id])
            .json(update.into_body())
            .if_match(etag);
        self.exec.call(config, &req).await
    }

    // ── Assignments ───────────────────────────────────────────────────

    /// `GET assignments/{assignmentID}`
    pub async fn get_assignment(
        &self,
        config: &EffectiveConfig,
        assignment_id: &str,
        view_type: Option<&str>,
    ) -> Result<DxResponse, DxError> {
        let req =
            DxRequest::get(&["assignments", assignment_id]).query_opt("viewType", view_type);
        self.exec.call(config, &req).await
    }

    /// `GET assignments/next`
    pub async fn get_next_assignment(
        &self,
        config: &EffectiveConfig,
        view_type: Option<&str>,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["assignments", "next"]).query_opt("viewType", view_type);
        self.exec.call(config, &req).await
    }

    /// `GET assignments/{assignmentID}/actions/{actionID}`
    pub async fn get_assignment_action(
        &self,
        config: &EffectiveConfig,
        assignment_id: &str,
        action_id: &str,
        view_type: Option<&str>,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["assignments", assignment_id, "actions", action_id])
            .query_opt("viewType", view_type);
        self.exec.call(config, &req).await
    }

    /// `PATCH assignments/{assignmentID}/actions/{actionID}` with `If-Match`
    pub async fn perform_assignment_action(
        &self,
        config: &EffectiveConfig,
        assignment_id: &str,
        action_id: &str,
        etag: &str,
        update: CaseUpdate,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::patch(&["assignments", assignment_id, "actions", action_id])
            .json(update.into_body())
            .if_match(etag);
        self.exec.call(config, &req).await
    }

    // ── Case types ────────────────────────────────────────────────────

    /// `GET casetypes`
    pub async fn get_case_types(&self, config: &EffectiveConfig) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["casetypes"]);
        self.exec.call(config, &req).await
    }

    // ── Data views ────────────────────────────────────────────────────

    /// `GET data_views/{dataViewID}/metadata`
    pub async fn get_data_view_metadata(
        &self,
        config: &EffectiveConfig,
        data_view_id: &str,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["data_views", data_view_id, "metadata"]);
        self.exec.call(config, &req).await
    }

    /// `POST data_views/{dataViewID}` — list rows with an optional query and
    /// paging block.
    pub async fn list_data_view(
        &self,
        config: &EffectiveConfig,
        data_view_id: &str,
        query: Option<&Value>,
        paging: Option<&Value>,
    ) -> Result<DxResponse, DxError> {
        let mut body = Map::new();
        if let Some(q) = query {
            body.insert("query".to_string(), q.clone());
        }
        if let Some(p) = paging {
            body.insert("paging".to_string(), p.clone());
        }

        let req = DxRequest::post(&["data_views", data_view_id]).json(Value::Object(body));
        self.exec.call(config, &req).await
    }

    // ── Attachments ───────────────────────────────────────────────────

    /// `GET cases/{caseID}/attachments`
    pub async fn get_case_attachments(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::get(&["cases", case_id, "attachments"]);
        self.exec.call(config, &req).await
    }

    /// `POST cases/{caseID}/attachments` — link previously uploaded files or
    /// URLs to a case.
    pub async fn add_case_attachments(
        &self,
        config: &EffectiveConfig,
        case_id: &str,
        attachments: &Value,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::post(&["cases", case_id, "attachments"])
            .json(json!({ "attachments": attachments }));
        self.exec.call(config, &req).await
    }

    /// `POST attachments/upload` — multipart upload of one file; the
    /// returned temporary id is linked with
    /// [`DxClient::add_case_attachments`].
    pub async fn upload_attachment(
        &self,
        config: &EffectiveConfig,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DxResponse, DxError> {
        let req =
            DxRequest::post(&["attachments", "upload"]).multipart(file_name, content_type, bytes);
        self.exec.call(config, &req).await
    }

    /// `DELETE attachments/{attachmentID}`
    pub async fn delete_attachment(
        &self,
        config: &EffectiveConfig,
        attachment_id: &str,
    ) -> Result<DxResponse, DxError> {
        let req = DxRequest::delete(&["attachments", attachment_id]);
        self.exec.call(config, &req).await
    }
}
