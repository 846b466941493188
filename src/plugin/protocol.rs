//! # Plugin Wire Protocol
//!
//! Line-delimited JSON-RPC 2.0. Every call is addressed by a method path that
//! includes the service identity, `dbplugin.v5.Database/<Operation>`, so the host
//! can tell a missing operation apart from a contract-version mismatch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::errors::PluginError;

/// Versioned service identity
pub const SERVICE_NAME: &str = "dbplugin.v5.Database";

/// Notification cancelling an in-flight request
pub const CANCEL_METHOD: &str = "$/cancelRequest";

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>, kind: &str) -> Self {
        Self { code, message: message.into(), data: Some(json!({ "kind": kind })) }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, message, "parse")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message, "invalid_request")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message, PluginError::validation("").kind())
    }

    /// The `data.kind` tag, if present
    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.get("kind")).and_then(Value::as_str)
    }
}

/// JSON-RPC error codes, standard and plugin-specific
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const CONNECTION_ERROR: i32 = -32001;
    pub const EXECUTION_ERROR: i32 = -32002;
    pub const TRANSACTION_ERROR: i32 = -32003;
    pub const GENERATION_ERROR: i32 = -32004;
    pub const CANCELLED: i32 = -32005;
}

/// Convert to JSON-RPC error code
pub fn error_code(error: &PluginError) -> i32 {
    match error {
        PluginError::Validation { .. } => error_codes::INVALID_PARAMS,
        PluginError::Connection { .. } => error_codes::CONNECTION_ERROR,
        PluginError::Execution { .. } => error_codes::EXECUTION_ERROR,
        PluginError::Transaction { .. } => error_codes::TRANSACTION_ERROR,
        PluginError::Generation { .. } => error_codes::GENERATION_ERROR,
        PluginError::Cancelled { .. } => error_codes::CANCELLED,
        PluginError::NotImplemented { .. } => error_codes::METHOD_NOT_FOUND,
        PluginError::Internal { .. } => error_codes::INTERNAL_ERROR,
    }
}

impl From<PluginError> for JsonRpcError {
    fn from(error: PluginError) -> Self {
        let mut data = json!({ "kind": error.kind(), "retryable": error.is_retryable() });
        if let Some(index) = error.statement_index() {
            data["statement_index"] = json!(index);
        }
        Self { code: error_code(&error), message: error.to_string(), data: Some(data) }
    }
}

/// Operations of the plugin contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    NewUser,
    UpdateUser,
    DeleteUser,
    Type,
    Close,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Initialize,
        Method::NewUser,
        Method::UpdateUser,
        Method::DeleteUser,
        Method::Type,
        Method::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Initialize => "Initialize",
            Method::NewUser => "NewUser",
            Method::UpdateUser => "UpdateUser",
            Method::DeleteUser => "DeleteUser",
            Method::Type => "Type",
            Method::Close => "Close",
        }
    }

    /// Fully qualified method path
    pub fn path(&self) -> String {
        format!("{}/{}", SERVICE_NAME, self.as_str())
    }

    /// Resolve a method path such as `/dbplugin.v5.Database/NewUser`.
    pub fn from_path(path: &str) -> Result<Self, RouteError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let (service, operation) = path.rsplit_once('/').unwrap_or(("", path));

        if service != SERVICE_NAME {
            return Err(RouteError::VersionMismatch { requested: service.to_string() });
        }

        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == operation)
            .ok_or_else(|| RouteError::NotImplemented { operation: operation.to_string() })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a method path could not be routed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Method not implemented: {operation}")]
    NotImplemented { operation: String },

    #[error("Service version mismatch: requested '{requested}'")]
    VersionMismatch { requested: String },
}

impl From<RouteError> for JsonRpcError {
    fn from(error: RouteError) -> Self {
        let mut rpc = match &error {
            RouteError::NotImplemented { .. } => {
                JsonRpcError::new(error_codes::METHOD_NOT_FOUND, error.to_string(), "not_implemented")
            }
            RouteError::VersionMismatch { .. } => {
                JsonRpcError::new(error_codes::METHOD_NOT_FOUND, error.to_string(), "version_mismatch")
            }
        };
        if let Some(data) = rpc.data.as_mut() {
            data["service"] = json!(SERVICE_NAME);
        }
        rpc
    }
}

/// Parameters of [`CANCEL_METHOD`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelParams {
    pub id: JsonRpcId,
}
