//! Line-delimited JSON-RPC over stdio.
//!
//! Each input line is one message; each response is written as one line.
//! Tool failures are successful JSON-RPC responses with `isError: true`, so
//! the client sees the message instead of a transport error.

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::dispatcher::ToolDispatcher;
use crate::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    PROTOCOL_VERSION, SERVER_NAME, parse_message,
};

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct StdioServer {
    dispatcher: Arc<ToolDispatcher>,
    initialized: bool,
}

impl StdioServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            dispatcher,
            initialized: false,
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Whether an `initialize` request has been answered.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve until `input` reaches end of file.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> std::io::Result<()> {
        info!(tools = self.dispatcher.tools().count(), "serving on stdio");
        for line in input.lines() {
            let line = line?;
            if let Some(reply) = self.handle_line(&line) {
                writeln!(output, "{}", reply)?;
                output.flush()?;
            }
        }
        info!("input closed, shutting down");
        Ok(())
    }

    /// Handle one input line, returning the serialized reply if there is one.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let reply = match parse_message(line) {
            Ok(IncomingMessage::Request(request)) => match self.handle_request(&request) {
                Ok(response) => serde_json::to_string(&response),
                Err(error) => serde_json::to_string(&error),
            },
            Ok(IncomingMessage::Notification(notification)) => {
                self.handle_notification(&notification);
                return None;
            }
            Err(error) => {
                warn!(code = error.error.code, message = %error.error.message, "rejected message");
                serde_json::to_string(&error)
            }
        };
        match reply {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, "failed to serialize reply");
                let fallback = JsonRpcError::new(None, ErrorCode::InternalError, "failed to serialize reply");
                serde_json::to_string(&fallback).ok()
            }
        }
    }

    fn handle_request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        debug!(method = %request.method, "request");
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(request)),
            "ping" => Ok(JsonRpcResponse::success(request.id.clone(), json!({}))),
            "tools/list" => Ok(JsonRpcResponse::success(
                request.id.clone(),
                json!({ "tools": self.dispatcher.tool_definitions() }),
            )),
            "tools/call" => self.handle_tools_call(request),
            other => Err(JsonRpcError::method_not_found(request.id.clone(), other)),
        }
    }

    fn handle_notification(&self, notification: &JsonRpcNotification) {
        debug!(method = %notification.method, "notification");
    }

    fn handle_initialize(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let client = request
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, "initialize");
        self.initialized = true;

        JsonRpcResponse::success(
            request.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                    "engine": self.dispatcher.engine_name(),
                },
            }),
        )
    }

    fn handle_tools_call(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = request
            .params
            .clone()
            .ok_or_else(|| JsonRpcError::invalid_params(request.id.clone(), "Missing tool call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::invalid_params(request.id.clone(), format!("Invalid tool call params: {}", e))
                })
            })?;

        let result = match self.dispatcher.execute(&params.name, params.arguments) {
            Ok(response) => serde_json::to_value(&response).map_err(|e| {
                JsonRpcError::new(
                    Some(request.id.clone()),
                    ErrorCode::InternalError,
                    format!("failed to serialize tool result: {}", e),
                )
            })?,
            Err(e) => {
                info!(tool = %params.name, error = %e, "tool call failed");
                json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                })
            }
        };
        Ok(JsonRpcResponse::success(request.id.clone(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use spicebox_core::{
        AnalysisRequest, CachedAnalysisResult, Circuit, Error as CoreError, SimulationEngine,
        SimulationOptions,
    };

    struct NoEngine;

    impl SimulationEngine for NoEngine {
        fn name(&self) -> &str {
            "none"
        }

        fn run(
            &self,
            _: &Circuit,
            _: &AnalysisRequest,
            _: &SimulationOptions,
        ) -> spicebox_core::Result<CachedAnalysisResult> {
            Err(CoreError::Engine("not available".into()))
        }
    }

    fn server() -> StdioServer {
        StdioServer::new(Arc::new(ToolDispatcher::new(Arc::new(NoEngine), ServerConfig::default())))
    }

    fn reply(server: &mut StdioServer, line: &str) -> Value {
        serde_json::from_str(&server.handle_line(line).unwrap()).unwrap()
    }

    #[test]
    fn test_initialize() {
        let mut s = server();
        let v = reply(
            &mut s,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"t"}}}"#,
        );
        assert_eq!(v["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(v["result"]["serverInfo"]["name"], "spicebox");
        assert!(s.is_initialized());
    }

    #[test]
    fn test_notifications_and_blank_lines_are_silent() {
        let mut s = server();
        assert!(s.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
        assert!(s.handle_line("   ").is_none());
    }

    #[test]
    fn test_tool_failure_is_error_result() {
        let mut s = server();
        let v = reply(
            &mut s,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"run_noise_analysis","arguments":{}}}"#,
        );
        assert_eq!(v["result"]["isError"], true);
        assert_eq!(v["result"]["content"][0]["text"], "Unknown tool: run_noise_analysis");
    }

    #[test]
    fn test_missing_params() {
        let mut s = server();
        let v = reply(&mut s, r#"{"jsonrpc":"2.0","id":3,"method":"tools/call"}"#);
        assert_eq!(v["error"]["code"], -32602);
    }
}
