//! JSON-RPC dispatcher for the MCP methods.
//!
//! Stateless: every call parses one envelope, routes it and returns exactly
//! one response. The request `id` is echoed untouched in every response the
//! dispatcher produces, including error responses.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::{Map, Value, json};

use crate::core::config::ServerConfig;
use crate::core::protocol::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolResult,
};
use crate::core::registry::{Lookup, ToolRegistry};
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity reported in `initialize` responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl From<&ServerConfig> for ServerInfo {
    fn from(config: &ServerConfig) -> Self {
        Self {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
        }
    }
}

/// Routes JSON-RPC envelopes to protocol methods and registered tools.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, info: ServerInfo) -> Self {
        Self { registry, info }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle a raw request body.
    ///
    /// Unparseable JSON yields `-32700` with a null id.
    pub fn handle_raw(&self, body: &[u8]) -> JsonRpcResponse {
        match parse_envelope(body) {
            Ok(request) => self.dispatch(request),
            Err(response) => response,
        }
    }

    /// Route one parsed request.
    ///
    /// A panic anywhere below is caught and answered with `-32603`, keeping
    /// the request id.
    pub fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        guarded(request, |request| self.route(request))
    }

    /// Handle one stdio line. Blank lines and id-less `notifications/*`
    /// produce no reply.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        if line.trim().is_empty() {
            return None;
        }
        match parse_envelope(line.as_bytes()) {
            Ok(request) if request.is_notification() => {
                tracing::debug!(method = %request.method, "notification received");
                None
            }
            Ok(request) => Some(self.dispatch(request)),
            Err(response) => Some(response),
        }
    }

    fn route(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %request.method, id = ?request.id, "dispatching");
        let JsonRpcRequest { id, method, params, .. } = request;
        match method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.tools_list_result()),
            "tools/call" => self.tools_call(id, params),
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(&method)),
        }
    }

    /// The fixed `initialize` result; also sent as the first SSE event.
    pub fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    pub fn tools_list_result(&self) -> Value {
        json!({ "tools": self.registry.list() })
    }

    fn tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p @ Value::Object(_)) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e)),
            },
            _ => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("tools/call requires an object with a tool name"),
                );
            }
        };

        let descriptor = match self.registry.resolve(&params.name) {
            Lookup::Found(descriptor) => descriptor,
            Lookup::Unknown => {
                return JsonRpcResponse::error(id, JsonRpcError::unknown_tool(&params.name));
            }
        };

        let arguments = match params.arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error(format!(
                        "arguments for {} must be an object, got {other}",
                        descriptor.name
                    )),
                );
            }
        };

        let result = match tools::invoke(descriptor.kind, &arguments) {
            Ok(output) => output.into_tool_result(),
            Err(e) if e.is_contract_violation() => {
                tracing::warn!(tool = descriptor.name, error = %e, "tool contract violation");
                return JsonRpcResponse::error(id, JsonRpcError::internal_error(e));
            }
            Err(e) => {
                tracing::warn!(tool = descriptor.name, error = %e, "tool failed");
                ToolResult::error(format!("Error: {e}"))
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e)),
        }
    }
}

/// Run `route`, turning a panic into `-32603` with the request's id.
pub(crate) fn guarded<F>(request: JsonRpcRequest, route: F) -> JsonRpcResponse
where
    F: FnOnce(JsonRpcRequest) -> JsonRpcResponse,
{
    let id = request.id.clone();
    match catch_unwind(AssertUnwindSafe(|| route(request))) {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            tracing::error!(%detail, "panic during dispatch");
            JsonRpcResponse::error(id, JsonRpcError::internal_error(detail))
        }
    }
}

/// Parse a request body into an envelope, or produce the error response.
///
/// Malformed JSON is `-32700` with a null id. Well-formed JSON that is not a
/// JSON-RPC 2.0 request object is `-32600`, echoing the id when readable.
pub fn parse_envelope(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "unparseable request body");
        JsonRpcResponse::error(None, JsonRpcError::parse_error())
    })?;

    let id = value.get("id").filter(|v| !v.is_null()).cloned();
    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_request(e)))?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request(format!(
                "unsupported jsonrpc version {:?}",
                request.jsonrpc
            )),
        ));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::{
        INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    };

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            ToolRegistry::builtin(),
            ServerInfo { name: "test".into(), version: "0.0.0".into() },
        )
    }

    fn call(body: Value) -> JsonRpcResponse {
        dispatcher().handle_raw(body.to_string().as_bytes())
    }

    #[test]
    fn ping_returns_empty_object() {
        let resp = call(json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}));
        assert_eq!(resp.result, Some(json!({})));
        assert_eq!(resp.id, Some(json!("p")));
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let resp = call(json!({"jsonrpc": "1.0", "id": 3, "method": "ping"}));
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, Some(json!(3)));
    }

    #[test]
    fn non_object_body_is_invalid_request() {
        let resp = dispatcher().handle_raw(b"[1, 2, 3]");
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, None);
    }

    #[test]
    fn truncated_body_is_parse_error() {
        let resp = dispatcher().handle_raw(br#"{"jsonrpc": "2.0", "id": 1"#);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
        assert_eq!(resp.id, None);
    }

    #[test]
    fn tools_call_without_params_is_invalid_params() {
        let resp = call(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"}));
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn non_object_arguments_are_internal_error() {
        let resp = call(json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {"name": "calculator", "arguments": "2+2"}
        }));
        let err = resp.error.unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert!(err.message.starts_with("Internal error: "));
    }

    #[test]
    fn panicking_route_keeps_request_id() {
        let request = parse_envelope(br#"{"jsonrpc": "2.0", "id": "req-9", "method": "ping"}"#).unwrap();
        let resp = guarded(request, |_| panic!("route exploded"));
        assert_eq!(resp.id, Some(json!("req-9")));
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.message, "Internal error: route exploded");
    }

    #[test]
    fn id_less_notifications_get_no_reply() {
        let d = dispatcher();
        assert!(d.handle_line(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#).is_none());
        assert!(d.handle_line("   ").is_none());
    }

    #[test]
    fn stdio_lines_that_are_not_notifications_are_answered() {
        let d = dispatcher();

        let resp = d.handle_line(r#"{"jsonrpc": "2.0", "method": "ping"}"#).unwrap();
        assert_eq!(resp.id, None);
        assert_eq!(resp.result, Some(json!({})));

        let resp = d
            .handle_line(r#"{"jsonrpc": "2.0", "id": 1, "method": "notifications/x"}"#)
            .unwrap();
        assert_eq!(resp.id, Some(json!(1)));
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = d.handle_line("{oops").unwrap();
        assert_eq!(resp.id, None);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn empty_registry_knows_no_tools() {
        let d = Dispatcher::new(
            ToolRegistry::new(),
            ServerInfo { name: "empty".into(), version: "0".into() },
        );
        let resp = d.handle_raw(
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "weather"}})
                .to_string()
                .as_bytes(),
        );
        assert_eq!(resp.error.unwrap().message, "Unknown tool: weather");
        assert_eq!(d.tools_list_result(), json!({"tools": []}));
    }
}
