use std::sync::Arc;

use serde::Serialize;

use super::blocking;
use crate::protocol::{GetFileArgs, ToolError, ToolResult};
use crate::storage::Stores;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetFileResponse {
    filename: String,
    content_type: String,
    source: String,
    upload_time: String,
    tags: Vec<String>,
    size: usize,
    content: String,
}

/// Handle a `get_file` tool call.
///
/// A missing file is reported as `NotFound`, which the envelope layer turns
/// into a soft error rather than a protocol error.
pub async fn handle(args: GetFileArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let store = Arc::clone(&stores.files);
    let key = args.filename.clone();
    let found = blocking(move || store.get(&key)).await?;

    let Some(file) = found else {
        tracing::debug!(filename = %args.filename, "file not found");
        return Err(ToolError::NotFound(format!(
            "File not found: {}",
            args.filename
        )));
    };

    let tags = file.metadata.parsed_tags();
    ToolResult::json(&GetFileResponse {
        size: file.content.len(),
        content: String::from_utf8_lossy(&file.content).into_owned(),
        filename: file.filename,
        content_type: file.content_type,
        source: file.metadata.source,
        upload_time: file.metadata.upload_time,
        tags,
    })
}
