//! JSON-RPC 2.0 message types for the MCP wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid params on a protocol envelope.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal error (result marshalling).
pub const INTERNAL_ERROR: i64 = -32603;

/// An incoming JSON-RPC 2.0 request. Notifications carry no `id` (read back
/// as `Null`).
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// An outgoing JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// A server-to-client notification: no id, no acknowledgement expected.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: LogMessageParams,
}

/// Params for `notifications/message`.
#[derive(Debug, Clone, Serialize)]
pub struct LogMessageParams {
    pub level: &'static str,
    pub data: String,
}

/// An MCP tool descriptor for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Params of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The result payload of a `tools/call` response. Tool failures are carried
/// here with `is_error` set, not as JSON-RPC errors.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One piece of content in a tool result.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

/// Build a success response for a request id.
pub fn success_response(id: Value, result: Value) -> Response {
    Response {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Build an error response for a request id.
pub fn error_response(id: Value, code: i64, message: impl Into<String>) -> Response {
    Response {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_serialization_shape() {
        let resp = success_response(json!(7), json!({"ok": true}));
        let encoded = serde_json::to_value(&resp).unwrap();
        assert_eq!(encoded, json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}}));

        let resp = error_response(Value::Null, METHOD_NOT_FOUND, "method not found");
        let encoded = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            encoded,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32601, "message": "method not found"}})
        );
    }

    #[test]
    fn tool_result_omits_is_error_on_success() {
        let ok = ToolResult {
            content: vec![ContentItem::text("{}")],
            is_error: false,
        };
        let encoded = serde_json::to_value(&ok).unwrap();
        assert!(encoded.get("isError").is_none());

        let failed = ToolResult {
            content: vec![ContentItem::text("boom")],
            is_error: true,
        };
        let encoded = serde_json::to_value(&failed).unwrap();
        assert_eq!(encoded["isError"], json!(true));
    }

    #[test]
    fn request_without_id_reads_as_null() {
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(req.id.is_null());
        assert_eq!(req.method, "notifications/initialized");
    }
}
