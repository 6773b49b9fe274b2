use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
use crate::storage::{FsBlobStore, SqliteContextStore, StorageError, Stores};

/// Maximum bytes per JSON-RPC message (1 MiB).
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// MCP server that answers JSON-RPC 2.0 envelopes POSTed over HTTP.
pub struct McpServer {
    config: ServerConfig,
    stores: Stores,
}

impl McpServer {
    /// Open the configured SQLite row store and blob directory.
    pub fn open(config: ServerConfig) -> Result<Self, StorageError> {
        let contexts = SqliteContextStore::open(&config.db_path)?;
        let files = FsBlobStore::open(&config.files_root)?;
        let stores = Stores::new(Arc::new(contexts), Arc::new(files));
        Ok(Self::with_stores(config, stores))
    }

    pub fn with_stores(config: ServerConfig, stores: Stores) -> Self {
        Self { config, stores }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        axum::serve(listener, router(self.stores))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl-c received; shutting down");
}

/// Build the HTTP surface. Every path is served by the same endpoint, and
/// every response leaves through the CORS layer.
pub fn router(stores: Stores) -> Router {
    Router::new()
        .fallback(handle_http)
        .layer(map_response(with_cors))
        .layer(TraceLayer::new_for_http())
        .with_state(stores)
}

async fn handle_http(State(stores): State<Stores>, request: Request) -> Response {
    // The method gate runs before any of the body is read.
    match *request.method() {
        Method::OPTIONS => return StatusCode::OK.into_response(),
        Method::POST => {}
        _ => return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response(),
    }

    let body = match to_bytes(request.into_body(), MAX_MESSAGE_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Rejected request body: {e}");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let response = handle_body(&body, &stores).await;
    Json(response).into_response()
}

/// Parse one envelope and dispatch it.
///
/// A body that is not JSON at all yields an internal-error envelope with a
/// null id. JSON that is not a request envelope yields `Invalid Request`,
/// keeping the id when one can be read.
pub async fn handle_body(body: &[u8], stores: &Stores) -> JsonRpcResponse {
    let raw: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Parse error: {e}");
            return JsonRpcResponse::error(
                None,
                JsonRpcError::unparseable(format!("Parse error: {e}")),
            );
        }
    };

    let req: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Invalid request envelope: {e}");
            return JsonRpcResponse::error(
                RpcId::salvage(&raw),
                JsonRpcError::invalid_request_with(format!("Invalid Request: {e}")),
            );
        }
    };

    // Validate jsonrpc version
    if req.jsonrpc != "2.0" {
        return JsonRpcResponse::error(req.id.clone(), JsonRpcError::invalid_request());
    }

    handlers::dispatch(&req, stores).await
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
