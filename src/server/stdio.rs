//! Stdio transport
//!
//! Line-delimited JSON-RPC over stdin/stdout. The read loop never blocks on
//! tool execution: every `tools/call` runs in its own task, so invocations
//! interleave freely and a slow upstream cannot stall `tools/list`. All log
//! output goes to stderr; stdout carries protocol frames only.
//!
//! `notifications/cancelled` aborts the matching in-flight task; aborting
//! drops the tool's future, which cancels any in-flight HTTP call.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::protocol::messages::rpc_codes;
use crate::protocol::{
    CancelledParams, InitializeResult, Info, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
    RequestId, ServerCapabilities, ToolsCallParams, ToolsCapability, ToolsListResult,
};
use crate::{Error, Result};

use super::dispatch::Dispatcher;

/// MCP server speaking JSON-RPC over stdio
pub struct StdioServer {
    dispatcher: Arc<Dispatcher>,
}

impl StdioServer {
    /// Create a server over a dispatcher.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run until stdin closes or a termination signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable transport failures; malformed
    /// individual frames are answered with JSON-RPC errors and skipped.
    pub async fn run(self) -> Result<()> {
        let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
        let inflight: Arc<DashMap<String, AbortHandle>> = Arc::new(DashMap::new());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        info!(
            tools = self.dispatcher.registry().len(),
            protocol = PROTOCOL_VERSION,
            "casebridge listening on stdio"
        );

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = shutdown_signal() => {
                    info!("Shutdown signal received");
                    break;
                }
            };

            let Some(line) = line else {
                debug!("stdin EOF, shutting down");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!(error = %e, "Unparseable frame");
                    write_response(
                        &stdout,
                        &JsonRpcResponse::error(None, rpc_codes::PARSE_ERROR, "Parse error"),
                    )
                    .await?;
                    continue;
                }
            };

            self.handle(request, &stdout, &inflight).await?;
        }

        drain(&inflight).await;
        Ok(())
    }

    async fn handle(
        &self,
        request: JsonRpcRequest,
        stdout: &Arc<Mutex<Stdout>>,
        inflight: &Arc<DashMap<String, AbortHandle>>,
    ) -> Result<()> {
        match (request.method.as_str(), request.id) {
            ("initialize", Some(id)) => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability::default()),
                    },
                    server_info: Info {
                        name: env!("CARGO_PKG_NAME").to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };
                write_response(
                    stdout,
                    &JsonRpcResponse::success(id, serde_json::to_value(result)?),
                )
                .await
            }

            ("notifications/initialized", None) => Ok(()),

            ("ping", Some(id)) => {
                write_response(stdout, &JsonRpcResponse::success(id, json!({}))).await
            }

            ("tools/list", Some(id)) => {
                let result = ToolsListResult {
                    tools: self.dispatcher.registry().all_definitions(),
                };
                write_response(
                    stdout,
                    &JsonRpcResponse::success(id, serde_json::to_value(result)?),
                )
                .await
            }

            ("tools/call", Some(id)) => {
                let params: ToolsCallParams = match request
                    .params
                    .map(serde_json::from_value)
                    .transpose()
                {
                    Ok(Some(params)) => params,
                    Ok(None) | Err(_) => {
                        return write_response(
                            stdout,
                            &JsonRpcResponse::error(
                                Some(id),
                                rpc_codes::INVALID_PARAMS,
                                "tools/call requires {name, arguments}",
                            ),
                        )
                        .await;
                    }
                };

                self.spawn_call(id, params, stdout, inflight);
                Ok(())
            }

            ("notifications/cancelled", None) => {
                if let Some(params) = request.params {
                    match serde_json::from_value::<CancelledParams>(params) {
                        Ok(cancel) => {
                            let key = cancel.request_id.to_string();
                            if let Some((_, handle)) = inflight.remove(&key) {
                                info!(request = %key, "Cancelling in-flight call");
                                handle.abort();
                            }
                        }
                        Err(e) => warn!(error = %e, "Malformed cancellation"),
                    }
                }
                Ok(())
            }

            (method, Some(id)) => {
                write_response(
                    stdout,
                    &JsonRpcResponse::error(
                        Some(id),
                        rpc_codes::METHOD_NOT_FOUND,
                        format!("Method not found: {method}"),
                    ),
                )
                .await
            }

            // Unknown notification: nothing to answer
            (_, None) => Ok(()),
        }
    }

    /// Run one tool call in its own task so the read loop stays free.
    fn spawn_call(
        &self,
        id: RequestId,
        params: ToolsCallParams,
        stdout: &Arc<Mutex<Stdout>>,
        inflight: &Arc<DashMap<String, AbortHandle>>,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let stdout = Arc::clone(stdout);
        let inflight_map = Arc::clone(inflight);
        let key = id.to_string();

        let task = tokio::spawn(async move {
            let reply = dispatcher.dispatch(&params.name, params.arguments).await;
            let result = Dispatcher::to_call_result(&reply);
            let response = JsonRpcResponse::success(id, result);
            if let Err(e) = write_response(&stdout, &response).await {
                warn!(error = %e, "Failed to write tool response");
            }
        });

        inflight.insert(key.clone(), task.abort_handle());

        // Reap the entry once the task completes on its own.
        tokio::spawn(async move {
            let _ = task.await;
            inflight_map.remove(&key);
        });
    }
}

/// Serialize one response as a single stdout line.
async fn write_response(stdout: &Arc<Mutex<Stdout>>, response: &JsonRpcResponse) -> Result<()> {
    let frame = serde_json::to_string(response)?;
    let mut out = stdout.lock().await;
    out.write_all(frame.as_bytes())
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    out.write_all(b"\n")
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    out.flush()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    Ok(())
}

/// Wait briefly for in-flight calls to finish before exiting.
async fn drain(inflight: &DashMap<String, AbortHandle>) {
    for _ in 0..100 {
        if inflight.is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    warn!(remaining = inflight.len(), "Drain timeout reached, exiting anyway");
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
