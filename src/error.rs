//! Error types for casebridge
//!
//! Two layers:
//!
//! - [`Error`] — process-level failures (configuration, registry build,
//!   transport). These can abort startup.
//! - [`DxError`] — per-invocation domain failures with a tagged
//!   [`ErrorKind`]. These never abort the process; they flow into the
//!   response shaper and come back to the caller as Markdown.

use std::io;

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for casebridge
pub type Result<T> = std::result::Result<T, Error>;

/// Process-level errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool registry build failure (duplicate name, invalid descriptor)
    #[error("Registry error: {0}")]
    Registry(String),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Tagged error kind for a single tool invocation.
///
/// The HTTP status table in [`ErrorKind::from_status`] is the single source
/// of truth for mapping upstream responses; everything else is produced
/// directly at the failing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Pre-validation failure (missing required field, enum violation, shape)
    InvalidArgument,
    /// Effective configuration could not be resolved
    ConfigInvalid,
    /// OAuth2 client-credentials exchange failed
    AuthFailed,
    /// 401 persisted after one token refresh and retry
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 400
    BadRequest,
    /// 412 — eTag mismatch on a conditional write
    PreconditionFailed,
    /// 409
    Conflict,
    /// 422 — upstream business-rule validation
    ValidationFail,
    /// 423 — record locked by another operator
    Locked,
    /// 424
    FailedDependency,
    /// 500 or any unmapped status
    InternalServerError,
    /// Could not reach the upstream at all
    ConnectionError,
    /// Outbound call exceeded its deadline
    Timeout,
    /// The preliminary read for an auto-fetched eTag failed
    EtagFetchFailed,
    /// The preliminary read succeeded but carried no eTag
    EtagMissing,
}

impl ErrorKind {
    /// Stable wire name for this kind, as rendered in error documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::AuthFailed => "AUTH_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::Conflict => "CONFLICT",
            Self::ValidationFail => "VALIDATION_FAIL",
            Self::Locked => "LOCKED",
            Self::FailedDependency => "FAILED_DEPENDENCY",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::EtagFetchFailed => "ETAG_FETCH_FAILED",
            Self::EtagMissing => "ETAG_MISSING",
        }
    }

    /// Map an upstream HTTP status to an error kind.
    ///
    /// Success statuses have no kind; unmapped failure statuses collapse to
    /// [`ErrorKind::InternalServerError`].
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            409 => Some(Self::Conflict),
            412 => Some(Self::PreconditionFailed),
            422 => Some(Self::ValidationFail),
            423 => Some(Self::Locked),
            424 => Some(Self::FailedDependency),
            _ => Some(Self::InternalServerError),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of the upstream's `errorDetails[]` convention.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Machine-oriented message
    #[serde(default)]
    pub message: String,
    /// Localized, user-facing message
    #[serde(default, rename = "localizedValue")]
    pub localized_value: Option<String>,
    /// Field path the detail refers to, when present
    #[serde(default, rename = "erroneousInputOutputFieldInPage")]
    pub field: Option<String>,
}

/// Upstream error body shape (`{"errorDetails": [...]}`, sometimes with a
/// top-level `localizedValue`).
#[derive(Debug, Clone, Default, Deserialize)]
struct UpstreamErrorBody {
    #[serde(default, rename = "errorDetails")]
    error_details: Vec<ErrorDetail>,
    #[serde(default, rename = "localizedValue")]
    localized_value: Option<String>,
}

/// A domain error for one tool invocation.
#[derive(Debug, Clone)]
pub struct DxError {
    /// Tagged kind (see the table in the error-handling design)
    pub kind: ErrorKind,
    /// Primary human-readable message
    pub message: String,
    /// HTTP status, when the error originated from an upstream response
    pub status: Option<u16>,
    /// Upstream `errorDetails[]`, when provided
    pub error_details: Vec<ErrorDetail>,
}

impl DxError {
    /// Create an error with no upstream status.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            error_details: Vec::new(),
        }
    }

    /// Create an error carrying an upstream status.
    pub fn with_status(kind: ErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status: Some(status),
            error_details: Vec::new(),
        }
    }

    /// Build a domain error from a non-success upstream response body.
    ///
    /// The body is parsed per the upstream convention; unparseable bodies
    /// degrade to a generic per-status message rather than failing.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let kind = ErrorKind::from_status(status).unwrap_or(ErrorKind::InternalServerError);
        let parsed: UpstreamErrorBody = serde_json::from_slice(body).unwrap_or_default();

        let message = parsed
            .localized_value
            .clone()
            .or_else(|| {
                parsed
                    .error_details
                    .first()
                    .map(|d| d.localized_value.clone().unwrap_or_else(|| d.message.clone()))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Upstream request failed with HTTP {status}"));

        Self {
            kind,
            message,
            status: Some(status),
            error_details: parsed.error_details,
        }
    }

    /// Wrap another error as an eTag auto-fetch failure.
    #[must_use]
    pub fn etag_fetch_failed(inner: &Self) -> Self {
        Self {
            kind: ErrorKind::EtagFetchFailed,
            message: format!(
                "Could not fetch the current eTag before the write: {} ({})",
                inner.message, inner.kind
            ),
            status: inner.status,
            error_details: inner.error_details.clone(),
        }
    }
}

impl std::fmt::Display for DxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for DxError {}
