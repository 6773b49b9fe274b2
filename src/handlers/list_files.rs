use std::sync::Arc;

use serde::Serialize;

use super::blocking;
use crate::model::FileEntry;
use crate::protocol::{ListFilesArgs, ToolError, ToolResult};
use crate::storage::{Limit, Stores};

#[derive(Debug, Serialize)]
struct ListFilesResponse {
    count: usize,
    files: Vec<FileEntry>,
}

/// Handle a `list_files` tool call: ascending by name, optional prefix, capped at `limit`.
pub async fn handle(args: ListFilesArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let limit = Limit::from_requested(args.limit);
    let prefix = args.prefix.filter(|p| !p.is_empty());

    let store = Arc::clone(&stores.files);
    let files = blocking(move || store.list(prefix.as_deref(), limit)).await?;

    ToolResult::json(&ListFilesResponse {
        count: files.len(),
        files,
    })
}
