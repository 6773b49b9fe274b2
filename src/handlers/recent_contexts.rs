use std::sync::Arc;

use super::blocking;
use super::search_contexts::contexts_result;
use crate::protocol::{RecentContextsArgs, ToolError, ToolResult};
use crate::storage::{ContextFilter, Limit, Stores};

/// Handle a `get_recent_contexts` tool call: newest first, optional source filter.
pub async fn handle(args: RecentContextsArgs, stores: &Stores) -> Result<ToolResult, ToolError> {
    let filter = ContextFilter {
        source: args.source.filter(|s| !s.is_empty()),
        ..ContextFilter::default()
    };
    let limit = Limit::from_requested(args.limit);

    let store = Arc::clone(&stores.contexts);
    let rows = blocking(move || store.query(&filter, limit)).await?;
    contexts_result(rows)
}
