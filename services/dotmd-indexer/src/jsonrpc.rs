//! JSON-RPC 2.0 types and method routing, shared by the stdio transport.
//! Mirrors the REST surface one method per endpoint rather than wrapping it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handlers::{self, AppState};

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// An error response with no request `id` to echo, for requests that
    /// failed to parse far enough to recover one (e.g. malformed JSON).
    pub fn error_public(error: JsonRpcError) -> Self {
        Self::error(None, error)
    }
}

impl JsonRpcError {
    pub fn parse_error() -> Self {
        Self {
            code: error_codes::PARSE_ERROR,
            message: "Parse error".to_string(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: error_codes::METHOD_NOT_FOUND,
            message: "Method not found".to_string(),
            data: Some(serde_json::json!({ "method": method })),
        }
    }

    fn invalid_params(details: String) -> Self {
        Self {
            code: error_codes::INVALID_PARAMS,
            message: "Invalid params".to_string(),
            data: Some(serde_json::json!({ "details": details })),
        }
    }

    fn from_dotmd_error(error: dotmd_core::DotmdError) -> Self {
        Self {
            code: error_codes::INTERNAL_ERROR,
            message: error.to_string(),
            data: Some(serde_json::json!({ "kind": handlers::error_code(&error) })),
        }
    }
}

/// Routes one JSON-RPC method call to the matching protocol-independent
/// handler. `id` is threaded through separately from `params` because a
/// malformed `params` still needs to echo the caller's `id` in the error.
pub async fn route_method(method: &str, params: Option<Value>, id: Option<Value>, state: &AppState) -> JsonRpcResponse {
    match method {
        "status" => match handlers::handle_status(state).await {
            Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null)),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::from_dotmd_error(e)),
        },
        "clear" => match handlers::handle_clear(state).await {
            Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null)),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::from_dotmd_error(e)),
        },
        "search" => match parse_params(params) {
            Ok(request) => match handlers::handle_search(state, request).await {
                Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null)),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::from_dotmd_error(e)),
            },
            Err(e) => JsonRpcResponse::error(id, e),
        },
        "index" => match parse_params(params) {
            Ok(request) => match handlers::handle_index(state, request).await {
                Ok(result) => JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null)),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::from_dotmd_error(e)),
            },
            Err(e) => JsonRpcResponse::error(id, e),
        },
        other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}
