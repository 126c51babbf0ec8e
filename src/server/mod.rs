//! MCP server
//!
//! [`dispatch`] routes `{name, arguments}` onto the registered tool;
//! [`stdio`] owns the JSON-RPC framing over stdin/stdout, spawns one task
//! per `tools/call`, and honors cancellation notifications.

pub mod dispatch;
pub mod stdio;

pub use dispatch::Dispatcher;
pub use stdio::StdioServer;
