//! MCP type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as published via `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (1-128 chars, `[a-zA-Z0-9_-]`)
    pub name: String,
    /// Tool description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input JSON Schema
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Client/Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// Name
    pub name: String,
    /// Version
    pub version: String,
}

/// Server capabilities advertised during initialize
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// List changed notification support
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_serializes_with_camel_case_schema_key() {
        let tool = Tool {
            name: "get_case".to_string(),
            description: Some("Fetch a case".to_string()),
            input_schema: json!({"type": "object"}),
        };
        let wire = serde_json::to_value(&tool).unwrap();

        assert_eq!(wire["name"], "get_case");
        assert!(wire.get("inputSchema").is_some());
        assert!(wire.get("input_schema").is_none());
    }

    #[test]
    fn capabilities_skip_absent_sections() {
        let caps = ServerCapabilities::default();
        let wire = serde_json::to_value(&caps).unwrap();
        assert!(wire.get("tools").is_none());
    }
}
