pub mod get_file;
pub mod list_files;
pub mod recent_contexts;
pub mod search_contexts;
pub mod store_context;
pub mod store_file;

use serde_json::Value;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolError, ToolResult};
use crate::registry::{self, ToolRequest};
use crate::storage::{StorageError, Stores};

/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Dispatch a JSON-RPC request to the appropriate handler.
pub async fn dispatch(req: &JsonRpcRequest, stores: &Stores) -> JsonRpcResponse {
    match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(req.id.clone(), initialize_result()),

        "tools/list" => JsonRpcResponse::success(req.id.clone(), registry::tools_list()),

        "tools/call" => {
            let outcome = call_tool(req.params.as_ref(), stores).await;
            JsonRpcResponse::from_tool_outcome(req.id.clone(), outcome)
        }

        other => {
            tracing::debug!(method = other, "unknown method");
            JsonRpcResponse::error(req.id.clone(), ToolError::BadMethod(other.to_string()).into())
        }
    }
}

fn initialize_result() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Decode `tools/call` params, resolve the tool, and run it.
pub async fn call_tool(params: Option<&Value>, stores: &Stores) -> Result<ToolResult, ToolError> {
    let params: ToolCallParams = match params {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| ToolError::BadArgument(format!("Invalid tools/call params: {e}")))?,
        None => return Err(ToolError::BadArgument("Missing params for tools/call".into())),
    };

    let request = ToolRequest::parse(&params.name, params.arguments.as_ref())?;
    tracing::debug!(tool = request.name(), "tools/call");
    run(request, stores).await
}

/// Run an already-validated tool request.
pub async fn run(request: ToolRequest, stores: &Stores) -> Result<ToolResult, ToolError> {
    match request {
        ToolRequest::StoreContext(args) => store_context::handle(args, stores).await,
        ToolRequest::SearchContexts(args) => search_contexts::handle(args, stores).await,
        ToolRequest::GetRecentContexts(args) => recent_contexts::handle(args, stores).await,
        ToolRequest::StoreFile(args) => store_file::handle(args, stores).await,
        ToolRequest::GetFile(args) => get_file::handle(args, stores).await,
        ToolRequest::ListFiles(args) => list_files::handle(args, stores).await,
    }
}

/// Run a storage call on the blocking pool (adapters are sync).
async fn blocking<T, F>(op: F) -> Result<T, ToolError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(ToolError::from),
        Err(join_err) => {
            tracing::error!("Task join error: {join_err}");
            Err(ToolError::StorageFailure("storage task did not complete".into()))
        }
    }
}
