//! eTag auto-fetch helper
//!
//! Write tools declare their `eTag` parameter as optional. When a caller
//! omits it, the current value is obtained through the corresponding read
//! endpoint before the write is issued — on the same effective
//! configuration, strictly read-then-write. A race against an external
//! writer is not prevented here; it surfaces at the write as
//! `PRECONDITION_FAILED`.

use crate::error::{DxError, ErrorKind};
use crate::session::EffectiveConfig;

use super::client::DxClient;

/// The entity a write targets, mapped to its eTag-bearing read endpoint.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    /// A case-wide action; reads via `GET cases/{id}/actions/{action}`
    CaseAction {
        /// Full case handle
        case_id: &'a str,
        /// Action name
        action_id: &'a str,
    },
    /// An assignment action; reads via
    /// `GET assignments/{id}/actions/{action}`
    AssignmentAction {
        /// Full assignment handle
        assignment_id: &'a str,
        /// Action name
        action_id: &'a str,
    },
}

impl EntityRef<'_> {
    fn describe(&self) -> String {
        match self {
            Self::CaseAction { case_id, action_id } => {
                format!("case action {case_id}/{action_id}")
            }
            Self::AssignmentAction {
                assignment_id,
                action_id,
            } => format!("assignment action {assignment_id}/{action_id}"),
        }
    }
}

/// Fetch the current `eTag` for `entity`.
///
/// # Errors
///
/// A failing read surfaces as `ETAG_FETCH_FAILED` wrapping the read's error;
/// a read without an `eTag` header surfaces as `ETAG_MISSING`. In both cases
/// the caller must not proceed with the write.
pub async fn fetch_etag(
    client: &DxClient,
    config: &EffectiveConfig,
    entity: EntityRef<'_>,
) -> Result<String, DxError> {
    let response = match entity {
        EntityRef::CaseAction { case_id, action_id } => {
            client
                .get_case_action(config, case_id, action_id, Some("form"))
                .await
        }
        EntityRef::AssignmentAction {
            assignment_id,
            action_id,
        } => {
            client
                .get_assignment_action(config, assignment_id, action_id, Some("form"))
                .await
        }
    }
    .map_err(|e| DxError::etag_fetch_failed(&e))?;

    match response.etag.as_deref().map(str::trim) {
        Some(etag) if !etag.is_empty() => Ok(etag.to_string()),
        _ => Err(DxError::new(
            ErrorKind::EtagMissing,
            format!(
                "The read for {} returned no eTag; the record may not be open for this action",
                entity.describe()
            ),
        )),
    }
}

/// Normalize a caller-supplied eTag: trimmed, `None` when effectively empty.
#[must_use]
pub fn normalize_etag(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
