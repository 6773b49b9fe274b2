use std::sync::Arc;

use chrono::Utc;

use super::blocking;
use crate::model::{format_timestamp, CustomMetadata};
use crate::protocol::{StoreFileArgs, ToolError, ToolResult};
use crate::storage::{StorageError, Stores};

/// Handle a `store_file` tool call.
///
/// Last write wins: an existing file with the same name is replaced along
/// with its metadata.
pub async fn handle(args: StoreFileArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let metadata = CustomMetadata {
        source: args.source,
        tags: serde_json::to_string(&args.tags).map_err(StorageError::from)?,
        upload_time: format_timestamp(Utc::now()),
    };
    let size = args.content.len();
    let filename = args.filename;

    let store = Arc::clone(&stores.files);
    let key = filename.clone();
    let content_type = args.content_type;
    let content = args.content;
    blocking(move || store.put(&key, content.as_bytes(), &content_type, &metadata)).await?;

    tracing::info!(%filename, size, "file stored");
    Ok(ToolResult::text(format!(
        "File stored successfully: {filename} ({size} bytes)"
    )))
}
