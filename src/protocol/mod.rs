//! MCP protocol types
//!
//! JSON-RPC message envelopes and the subset of MCP the server speaks:
//! `initialize`, `tools/list`, `tools/call`, `ping`, and the
//! cancellation notification.

pub mod messages;
pub mod types;

pub use messages::{
    CancelledParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    ToolsCallParams, ToolsListResult,
};
pub use types::{Info, ServerCapabilities, Tool, ToolsCapability};

/// MCP protocol version supported by this server
pub const PROTOCOL_VERSION: &str = "2024-11-05";
