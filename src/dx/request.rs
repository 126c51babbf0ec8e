//! Outbound request record
//!
//! A [`DxRequest`] is an ephemeral, transport-agnostic description of one
//! REST call. The executor turns it into an actual HTTP request per attempt,
//! which is what makes the single 401 retry possible even for multipart
//! bodies: the record owns its bytes and can be replayed.

use reqwest::Method;
use serde_json::Value;

/// Request body payload
#[derive(Debug, Clone)]
pub enum DxBody {
    /// JSON document (`Content-Type: application/json`)
    Json(Value),
    /// One-file multipart upload (part name `file`)
    Multipart {
        /// File name reported to the upstream
        file_name: String,
        /// MIME type of the part
        content_type: String,
        /// File contents, read fully before the call starts
        bytes: Vec<u8>,
    },
}

/// One outbound REST call against the DX API
#[derive(Debug, Clone)]
pub struct DxRequest {
    /// HTTP method
    pub method: Method,
    /// Path segments below the API base; each segment is percent-encoded
    /// individually when the URL is built
    pub path: Vec<String>,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Body, when the method carries one
    pub body: Option<DxBody>,
    /// `If-Match` header value for conditional writes
    pub if_match: Option<String>,
}

impl DxRequest {
    fn new(method: Method, path: &[&str]) -> Self {
        Self {
            method,
            path: path.iter().map(ToString::to_string).collect(),
            query: Vec::new(),
            body: None,
            if_match: None,
        }
    }

    /// GET request for the given path segments.
    #[must_use]
    pub fn get(path: &[&str]) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request for the given path segments.
    #[must_use]
    pub fn post(path: &[&str]) -> Self {
        Self::new(Method::POST, path)
    }

    /// PATCH request for the given path segments.
    #[must_use]
    pub fn patch(path: &[&str]) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE request for the given path segments.
    #[must_use]
    pub fn delete(path: &[&str]) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query pair.
    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query pair when the value is present.
    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(DxBody::Json(body));
        self
    }

    /// Attach a one-file multipart body.
    #[must_use]
    pub fn multipart(mut self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.body = Some(DxBody::Multipart {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        });
        self
    }

    /// Attach an `If-Match` precondition.
    #[must_use]
    pub fn if_match(mut self, etag: &str) -> Self {
        self.if_match = Some(etag.to_string());
        self
    }

    /// Dotted label for logging (`GET cases/{id}` style, unencoded).
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path.join("/"))
    }
}
