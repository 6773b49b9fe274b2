use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::blocking;
use crate::model::{format_timestamp, Context};
use crate::protocol::{StoreContextArgs, ToolError, ToolResult};
use crate::storage::Stores;

/// Handle a `store_context` tool call.
///
/// Assigns a fresh id and the current server time, flattens tags and
/// metadata to JSON text, and inserts a single row. Duplicate content is
/// never rejected.
pub async fn handle(args: StoreContextArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let context = Context {
        id: Uuid::new_v4().to_string(),
        content: args.content,
        tags: args.tags,
        source: args.source,
        timestamp: format_timestamp(Utc::now()),
        metadata: args.metadata,
    };
    let row = context.to_row()?;

    let store = Arc::clone(&stores.contexts);
    blocking(move || store.insert(&row)).await?;

    tracing::info!(id = %context.id, source = %context.source, "context stored");
    Ok(ToolResult::text(format!(
        "Context stored successfully with ID: {}",
        context.id
    )))
}
