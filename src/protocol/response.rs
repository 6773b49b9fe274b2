use serde::{Deserialize, Serialize};
use serde_json::json;

use super::request::RpcId;
use crate::storage::StorageError;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 response layer
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 response envelope.
///
/// `id` is always serialized; it is `null` when the request id could not be
/// recovered.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Wrap the outcome of a tool call.
    ///
    /// `NotFound` is a soft error: it travels inside a successful envelope
    /// as a tool result flagged `isError`. Every other kind becomes an
    /// error envelope.
    pub fn from_tool_outcome(id: Option<RpcId>, outcome: Result<ToolResult, ToolError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result.into()),
            Err(ToolError::NotFound(message)) => Self::success(id, ToolResult::error(message).into()),
            Err(err) => Self::error(id, err.into()),
        }
    }
}

/// JSON-RPC 2.0 error object (protocol-level errors).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn invalid_request() -> Self {
        Self { code: -32600, message: "Invalid Request".into(), data: None }
    }

    pub fn invalid_request_with(detail: impl Into<String>) -> Self {
        Self { code: -32600, message: detail.into(), data: None }
    }

    /// Envelope-level failure: the body could not be parsed at all.
    pub fn unparseable(detail: impl Into<String>) -> Self {
        Self { code: -32603, message: detail.into(), data: None }
    }
}

// ---------------------------------------------------------------------------
// MCP tool result layer (returned inside a *successful* JSON-RPC response)
// ---------------------------------------------------------------------------

/// MCP tool call result wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// A single content block inside a tool result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".into(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".into(),
                text: text.into(),
            }],
            is_error: true,
        }
    }

    /// Serialize a payload as pretty JSON inside a single text block.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, ToolError> {
        let text = serde_json::to_string_pretty(payload).map_err(|e| {
            tracing::error!("Serialization failed: {e}");
            ToolError::StorageFailure(format!("cannot serialize result: {e}"))
        })?;
        Ok(Self::text(text))
    }
}

impl From<ToolResult> for serde_json::Value {
    fn from(result: ToolResult) -> Self {
        let content: Vec<serde_json::Value> = result
            .content
            .into_iter()
            .map(|block| json!({ "type": block.content_type, "text": block.text }))
            .collect();
        if result.is_error {
            json!({ "content": content, "isError": true })
        } else {
            json!({ "content": content })
        }
    }
}

// ---------------------------------------------------------------------------
// Tool-level error kinds
// ---------------------------------------------------------------------------

/// Closed set of failure kinds a request can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadMethod,
    BadTool,
    BadArgument,
    StorageFailure,
    NotFound,
}

impl ErrorKind {
    /// Map to the corresponding JSON-RPC 2.0 error code.
    ///
    /// Unknown method        → -32601 (Method not found)
    /// Unknown tool/argument → -32602 (Invalid params)
    /// Storage failures      → -32603 (Internal error)
    ///
    /// `NotFound` never reaches the error branch; its code is only used if
    /// a caller forces it there.
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::BadMethod => -32601,
            Self::BadTool | Self::BadArgument => -32602,
            Self::StorageFailure | Self::NotFound => -32603,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Method not found: {0}")]
    BadMethod(String),
    #[error("Unknown tool: {0}")]
    BadTool(String),
    #[error("{0}")]
    BadArgument(String),
    #[error("Internal error: {0}")]
    StorageFailure(String),
    #[error("{0}")]
    NotFound(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadMethod(_) => ErrorKind::BadMethod,
            Self::BadTool(_) => ErrorKind::BadTool,
            Self::BadArgument(_) => ErrorKind::BadArgument,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<StorageError> for ToolError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(detail) => Self::BadArgument(detail),
            other => {
                tracing::error!("Storage failure: {other}");
                Self::StorageFailure(other.to_string())
            }
        }
    }
}

/// Convert a tool error into a JSON-RPC error.
///
/// The JSON-RPC `code` is derived from the error kind. The kind itself is
/// carried in `data` so clients can tell apart kinds that share a code.
impl From<ToolError> for JsonRpcError {
    fn from(err: ToolError) -> Self {
        let kind = err.kind();
        Self {
            code: kind.json_rpc_code(),
            message: err.to_string(),
            data: Some(json!({ "kind": kind })),
        }
    }
}
