//! In-process stub of the DX API and its OAuth2 token endpoint.
//!
//! Bound to an ephemeral port per test. Every request is recorded so tests
//! can assert exact call counts and ordering (token before read before
//! write, exactly one retry, and so on). Behavior knobs are plain atomics on
//! the shared state, adjusted per test after spawn.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::json;

use casebridge::auth::TokenCache;
use casebridge::config::ApiConfig;
use casebridge::dx::{DxClient, HttpExecutor};
use casebridge::server::Dispatcher;
use casebridge::tool::{ToolContext, ToolRegistry};
use casebridge::tools;

/// One recorded API call (token requests are counted separately).
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub if_match: Option<String>,
    pub authorization: Option<String>,
}

/// Shared stub state: counters, the call log, and behavior knobs.
pub struct StubState {
    pub token_calls: AtomicUsize,
    pub token_auth_headers: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<RecordedCall>>,
    /// First N data responses are 401 regardless of path
    pub data_401s: AtomicUsize,
    /// `eTag` header returned by GET .../actions/... reads (empty = none)
    pub read_etag: Mutex<Option<String>>,
    /// Status for GET .../actions/... reads
    pub read_status: AtomicU16,
    /// Status for PATCH writes
    pub write_status: AtomicU16,
    /// Artificial latency for the token endpoint, in milliseconds
    pub token_delay_ms: AtomicUsize,
}

impl StubState {
    fn new() -> Self {
        Self {
            token_calls: AtomicUsize::new(0),
            token_auth_headers: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            data_401s: AtomicUsize::new(0),
            read_etag: Mutex::new(None),
            read_status: AtomicU16::new(200),
            write_status: AtomicU16::new(200),
            token_delay_ms: AtomicUsize::new(0),
        }
    }

    pub fn token_count(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn data_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_read_etag(&self, etag: &str) {
        *self.read_etag.lock().unwrap() = Some(etag.to_string());
    }
}

/// A running stub server.
pub struct StubServer {
    pub state: Arc<StubState>,
    pub base_url: String,
    pub token_url: String,
}

impl StubServer {
    /// Bind to an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::new());

        let app = axum::Router::new()
            .route("/oauth2/v1/token", post(token_handler))
            .fallback(data_handler)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self {
            state,
            base_url: format!("http://{addr}/prweb/api/dx/v2"),
            token_url: format!("http://{addr}/oauth2/v1/token"),
        }
    }

    /// Process-default API config pointing at this stub.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            token_url: self.token_url.clone(),
            client_id: "stub-client".to_string(),
            client_secret: "stub-secret".to_string(),
        }
    }

    /// A dispatcher over the full tool catalog, wired to this stub.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenCache::new(http.clone(), Duration::from_secs(5)));
        let executor = HttpExecutor::new(http, tokens, Duration::from_secs(5));
        let client = Arc::new(DxClient::new(executor));
        let ctx = Arc::new(ToolContext::new(client, self.api_config()));
        let registry = Arc::new(ToolRegistry::build(tools::catalog()).expect("registry"));
        Arc::new(Dispatcher::new(registry, ctx))
    }
}

#[derive(serde::Deserialize)]
struct TokenForm {
    grant_type: String,
}

async fn token_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form: TokenForm = match serde_urlencoded::from_bytes(&body) {
        Ok(form) => form,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_request"})))
                .into_response();
        }
    };
    if form.grant_type != "client_credentials" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        )
            .into_response();
    }

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state
            .token_auth_headers
            .lock()
            .unwrap()
            .push(auth.to_string());
    }

    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("tok-{n}"),
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn data_handler(State(state): State<Arc<StubState>>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let if_match = request
        .headers()
        .get("if-match")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let authorization = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        if_match,
        authorization,
    });

    // Burn through configured 401s first (token-expiry simulation)
    loop {
        let remaining = state.data_401s.load(Ordering::SeqCst);
        if remaining == 0 {
            break;
        }
        if state
            .data_401s
            .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"localizedValue": "Token expired"})),
            )
                .into_response();
        }
    }

    let is_action_read = method == "GET" && path.contains("/actions/");

    if is_action_read {
        let status = state.read_status.load(Ordering::SeqCst);
        if status != 200 {
            return error_response(status);
        }
        let mut response = Json(json!({
            "caseInfo": {"ID": "MYORG-WORK C-1", "status": "Open"},
            "uiResources": {"root": {"type": "reference"}}
        }))
        .into_response();
        if let Some(etag) = state.read_etag.lock().unwrap().clone() {
            response
                .headers_mut()
                .insert("etag", HeaderValue::from_str(&etag).unwrap());
        }
        return response;
    }

    if method == "PATCH" {
        let status = state.write_status.load(Ordering::SeqCst);
        if status != 200 {
            return error_response(status);
        }
        let mut response = Json(json!({
            "caseInfo": {"ID": "MYORG-WORK C-1", "status": "Pending-Review"}
        }))
        .into_response();
        response
            .headers_mut()
            .insert("etag", HeaderValue::from_static("v2"));
        return response;
    }

    Json(json!({
        "caseInfo": {
            "ID": "MYORG-WORK C-1",
            "caseTypeName": "Service Request",
            "status": "Open",
            "stageLabel": "Review",
            "urgency": "10"
        }
    }))
    .into_response()
}

fn error_response(status: u16) -> Response {
    let body = match status {
        412 => json!({
            "errorDetails": [{
                "message": "Error_Update_Conflict",
                "localizedValue": "The record was changed by another operator"
            }]
        }),
        422 => json!({
            "errorDetails": [{
                "message": "Error_Validation",
                "localizedValue": "Amount is required",
                "erroneousInputOutputFieldInPage": ".Amount"
            }]
        }),
        _ => json!({"localizedValue": format!("Stub failure {status}")}),
    };
    (
        StatusCode::from_u16(status).expect("valid stub status"),
        Json(body),
    )
        .into_response()
}
