//! JSON-RPC 2.0 message types for the line-delimited stdio transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "spicebox";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }
}

/// A request: carries an id and expects a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// A notification: no id, no response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    /// `null` when the request id could not be determined.
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: JsonRpcErrorData {
                code: code.code(),
                message: message.into(),
                data: None,
            },
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(None, ErrorCode::ParseError, message)
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), ErrorCode::MethodNotFound, format!("Method not found: {}", method))
    }

    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, message)
    }
}

/// Parse one line into a request or notification.
pub fn parse_message(line: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| JsonRpcError::parse_error(format!("Parse error: {}", e)))?;

    let id = value
        .get("id")
        .filter(|id| !id.is_null())
        .map(|id| serde_json::from_value::<RequestId>(id.clone()));
    let id = match id {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            return Err(JsonRpcError::new(None, ErrorCode::InvalidRequest, "Invalid request id"));
        }
        None => None,
    };

    if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcError::new(id, ErrorCode::InvalidRequest, "jsonrpc must be \"2.0\""));
    }
    if !value.get("method").is_some_and(Value::is_string) {
        return Err(JsonRpcError::new(id, ErrorCode::InvalidRequest, "method must be a string"));
    }

    let invalid = |id: Option<RequestId>, e: serde_json::Error| {
        JsonRpcError::new(id, ErrorCode::InvalidRequest, format!("Invalid request: {}", e))
    };
    match id {
        Some(id) => serde_json::from_value(value)
            .map(IncomingMessage::Request)
            .map_err(|e| invalid(Some(id), e)),
        None => serde_json::from_value(value)
            .map(IncomingMessage::Notification)
            .map_err(|e| invalid(None, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_and_notification() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Request(ref r) if r.id == RequestId::Number(7)));

        let msg = parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Notification(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.error.code, -32700);
        assert!(err.id.is_none());
    }

    #[test]
    fn test_invalid_request_keeps_id() {
        let err = parse_message(r#"{"jsonrpc":"1.0","id":"a","method":"ping"}"#).unwrap_err();
        assert_eq!(err.error.code, -32600);
        assert_eq!(err.id, Some(RequestId::String("a".into())));
    }

    #[test]
    fn test_error_serialization() {
        let err = JsonRpcError::method_not_found(RequestId::Number(1), "foo");
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["error"]["code"], -32601);
        assert_eq!(v["id"], 1);
        assert!(v["error"].get("data").is_none());
    }
}
