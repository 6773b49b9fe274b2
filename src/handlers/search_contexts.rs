use std::sync::Arc;

use serde::Serialize;

use super::blocking;
use crate::model::{Context, ContextRow};
use crate::protocol::{SearchContextsArgs, ToolError, ToolResult};
use crate::storage::{ContextFilter, Limit, StorageError, Stores};

#[derive(Debug, Serialize)]
pub(crate) struct ContextsResponse {
    count: usize,
    contexts: Vec<Context>,
}

/// Handle a `search_contexts` tool call.
///
/// Text, source and tag filters are conjoined. Within the tag list a row
/// matches when *any* requested tag appears in its stored tags. Results
/// come back newest first, truncated to `limit`.
pub async fn handle(args: SearchContextsArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let filter = build_filter(&args)?;
    let limit = Limit::from_requested(args.limit);

    let store = Arc::clone(&stores.contexts);
    let rows = blocking(move || store.query(&filter, limit)).await?;
    contexts_result(rows)
}

/// Build the row predicate from the optional search fields.
///
/// Empty strings and an empty tag list count as "not given".
pub fn build_filter(args: &SearchContextsArgs) -> Result<ContextFilter, ToolError> {
    let mut filter = ContextFilter::default();

    if let Some(query) = args.query.as_deref().filter(|q| !q.is_empty()) {
        filter.content_contains = Some(query.to_string());
    }

    if let Some(source) = args.source.as_deref().filter(|s| !s.is_empty()) {
        filter.source = Some(source.to_string());
    }

    if let Some(tags) = args.tags.as_ref().filter(|t| !t.is_empty()) {
        // Match on each tag's serialized form, so `"a"` hits `["a","b"]` but not `["ab"]`.
        filter.any_tag_patterns = tags
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
    }

    Ok(filter)
}

/// Shape stored rows into the `{count, contexts}` payload.
pub(crate) fn contexts_result(rows: Vec<ContextRow>) -> Result<ToolResult, ToolError> {
    let contexts = rows
        .into_iter()
        .map(Context::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    ToolResult::json(&ContextsResponse {
        count: contexts.len(),
        contexts,
    })
}
