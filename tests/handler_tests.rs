//! Integration tests for the six tool handlers.
//!
//! Handlers are exercised directly against in-memory stores, and once more
//! against the SQLite and directory adapters.

use std::sync::Arc;

use mcp_context_share::handlers;
use mcp_context_share::protocol::{
    GetFileArgs, ListFilesArgs, RecentContextsArgs, SearchContextsArgs, StoreContextArgs,
    StoreFileArgs, ToolError, ToolResult,
};
use mcp_context_share::storage::{FsBlobStore, SqliteContextStore, Stores};
use serde_json::{json, Map, Value};

fn text(result: &ToolResult) -> &str {
    &result.content[0].text
}

fn parse(result: &ToolResult) -> Value {
    serde_json::from_str(text(result)).unwrap()
}

fn context_args(content: &str, tags: &[&str], source: &str) -> StoreContextArgs {
    StoreContextArgs {
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        source: source.to_string(),
        metadata: Map::new(),
    }
}

fn search(query: Option<&str>, tags: Option<&[&str]>, source: Option<&str>, limit: i64) -> SearchContextsArgs {
    SearchContextsArgs {
        query: query.map(String::from),
        tags: tags.map(|t| t.iter().map(|s| s.to_string()).collect()),
        source: source.map(String::from),
        limit,
    }
}

fn file_args(filename: &str, content: &str, source: &str) -> StoreFileArgs {
    StoreFileArgs {
        filename: filename.to_string(),
        content: content.to_string(),
        content_type: "text/plain".to_string(),
        tags: Vec::new(),
        source: source.to_string(),
    }
}

fn disk_stores(root: &std::path::Path) -> Stores {
    Stores::new(
        Arc::new(SqliteContextStore::open(root.join("contexts.db")).unwrap()),
        Arc::new(FsBlobStore::open(root.join("files")).unwrap()),
    )
}

// ---------------------------------------------------------------------------
// store_context / get_recent_contexts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_context_reports_generated_id() {
    let stores = Stores::in_memory();

    let result = handlers::store_context::handle(context_args("hello", &[], "agent"), &stores)
        .await
        .unwrap();

    assert!(!result.is_error);
    let message = text(&result);
    assert!(message.starts_with("Context stored successfully with ID: "));
    let id = message.trim_start_matches("Context stored successfully with ID: ");
    assert!(!id.is_empty());
}

#[tokio::test]
async fn store_then_recent_round_trips_fields() {
    let stores = Stores::in_memory();
    let mut args = context_args("deploy notes", &["ops", "prod"], "agent-a");
    args.metadata.insert("priority".into(), json!(2));
    handlers::store_context::handle(args, &stores).await.unwrap();

    let result = handlers::recent_contexts::handle(
        RecentContextsArgs { limit: 5, source: Some("agent-a".into()) },
        &stores,
    )
    .await
    .unwrap();

    let value = parse(&result);
    assert_eq!(value["count"], 1);
    let ctx = &value["contexts"][0];
    assert_eq!(ctx["content"], "deploy notes");
    assert_eq!(ctx["tags"], json!(["ops", "prod"]));
    assert_eq!(ctx["source"], "agent-a");
    assert_eq!(ctx["metadata"]["priority"], 2);
    assert!(!ctx["id"].as_str().unwrap().is_empty());
    assert!(!ctx["timestamp"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_content_is_stored_twice_with_distinct_ids() {
    let stores = Stores::in_memory();
    for _ in 0..2 {
        handlers::store_context::handle(context_args("same", &[], "s"), &stores)
            .await
            .unwrap();
    }

    let result = handlers::recent_contexts::handle(RecentContextsArgs { limit: 5, source: None }, &stores)
        .await
        .unwrap();
    let value = parse(&result);
    let contexts = value["contexts"].as_array().unwrap();
    assert_eq!(contexts.len(), 2);
    assert_ne!(contexts[0]["id"], contexts[1]["id"]);
}

#[tokio::test]
async fn recent_contexts_newest_first_and_limited() {
    let stores = Stores::in_memory();
    for i in 0..7 {
        handlers::store_context::handle(context_args(&format!("note {i}"), &[], "s"), &stores)
            .await
            .unwrap();
    }

    let result = handlers::recent_contexts::handle(RecentContextsArgs { limit: 5, source: None }, &stores)
        .await
        .unwrap();
    let value = parse(&result);
    let contexts = value["contexts"].as_array().unwrap();

    assert_eq!(contexts.len(), 5);
    assert_eq!(contexts[0]["content"], "note 6");
    assert_eq!(contexts[4]["content"], "note 2");

    let stamps: Vec<&str> = contexts.iter().map(|c| c["timestamp"].as_str().unwrap()).collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted, "timestamps must be non-increasing");
}

#[tokio::test]
async fn recent_contexts_filters_by_source() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("one", &[], "alpha"), &stores).await.unwrap();
    handlers::store_context::handle(context_args("two", &[], "beta"), &stores).await.unwrap();

    let result = handlers::recent_contexts::handle(
        RecentContextsArgs { limit: 5, source: Some("beta".into()) },
        &stores,
    )
    .await
    .unwrap();
    let value = parse(&result);
    assert_eq!(value["count"], 1);
    assert_eq!(value["contexts"][0]["content"], "two");
}

// ---------------------------------------------------------------------------
// search_contexts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_by_query_finds_substring() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("Harvey likes lists", &["harvey"], "test"), &stores)
        .await
        .unwrap();
    handlers::store_context::handle(context_args("unrelated", &[], "test"), &stores)
        .await
        .unwrap();

    let result = handlers::search_contexts::handle(search(Some("Harvey"), None, None, 10), &stores)
        .await
        .unwrap();
    let value = parse(&result);

    assert_eq!(value["count"], 1);
    assert_eq!(value["contexts"][0]["content"], "Harvey likes lists");
}

#[tokio::test]
async fn search_tags_match_any_requested_tag() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("has a", &["a"], "s"), &stores).await.unwrap();
    handlers::store_context::handle(context_args("has b", &["b"], "s"), &stores).await.unwrap();
    handlers::store_context::handle(context_args("has c", &["c"], "s"), &stores).await.unwrap();

    let result = handlers::search_contexts::handle(search(None, Some(&["a", "b"][..]), None, 10), &stores)
        .await
        .unwrap();
    let value = parse(&result);

    let mut contents: Vec<&str> = value["contexts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, vec!["has a", "has b"]);
}

#[tokio::test]
async fn search_tag_does_not_match_tag_containing_it() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("longer tag", &["ab"], "s"), &stores).await.unwrap();

    let result = handlers::search_contexts::handle(search(None, Some(&["a"][..]), None, 10), &stores)
        .await
        .unwrap();
    assert_eq!(parse(&result)["count"], 0);
}

#[tokio::test]
async fn search_filter_kinds_are_conjoined() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("deploy plan", &["ops"], "alpha"), &stores).await.unwrap();
    handlers::store_context::handle(context_args("deploy plan", &["ops"], "beta"), &stores).await.unwrap();
    handlers::store_context::handle(context_args("deploy plan", &["dev"], "alpha"), &stores).await.unwrap();

    let result = handlers::search_contexts::handle(
        search(Some("deploy"), Some(&["ops"][..]), Some("alpha"), 10),
        &stores,
    )
    .await
    .unwrap();
    let value = parse(&result);
    assert_eq!(value["count"], 1);
    assert_eq!(value["contexts"][0]["source"], "alpha");
    assert_eq!(value["contexts"][0]["tags"], json!(["ops"]));
}

#[tokio::test]
async fn search_limit_bounds_results() {
    let stores = Stores::in_memory();
    for i in 0..4 {
        handlers::store_context::handle(context_args(&format!("item {i}"), &[], "s"), &stores)
            .await
            .unwrap();
    }

    let limited = handlers::search_contexts::handle(search(None, None, None, 2), &stores)
        .await
        .unwrap();
    assert_eq!(parse(&limited)["count"], 2);
    assert_eq!(parse(&limited)["contexts"][0]["content"], "item 3");

    let unbounded = handlers::search_contexts::handle(search(None, None, None, -1), &stores)
        .await
        .unwrap();
    assert_eq!(parse(&unbounded)["count"], 4);
}

#[tokio::test]
async fn search_empty_query_is_ignored() {
    let stores = Stores::in_memory();
    handlers::store_context::handle(context_args("anything", &[], "s"), &stores).await.unwrap();

    let result = handlers::search_contexts::handle(search(Some(""), Some(&[][..]), None, 10), &stores)
        .await
        .unwrap();
    assert_eq!(parse(&result)["count"], 1);
}

#[test]
fn build_filter_serializes_tags() {
    let filter = handlers::search_contexts::build_filter(&search(None, Some(&["x", "y z"][..]), None, 10)).unwrap();
    assert_eq!(filter.any_tag_patterns, vec!["\"x\"".to_string(), "\"y z\"".to_string()]);
    assert!(filter.content_contains.is_none());
    assert!(filter.source.is_none());
}

// ---------------------------------------------------------------------------
// store_file / get_file / list_files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_then_get_file() {
    let stores = Stores::in_memory();
    let stored = handlers::store_file::handle(file_args("x.txt", "hello", "s"), &stores)
        .await
        .unwrap();
    assert!(text(&stored).contains("x.txt"));

    let result = handlers::get_file::handle(GetFileArgs { filename: "x.txt".into() }, &stores)
        .await
        .unwrap();
    let value = parse(&result);

    assert_eq!(value["filename"], "x.txt");
    assert_eq!(value["content"], "hello");
    assert_eq!(value["contentType"], "text/plain");
    assert_eq!(value["source"], "s");
    assert_eq!(value["tags"], json!([]));
    assert!(!value["uploadTime"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn store_file_overwrites_silently() {
    let stores = Stores::in_memory();
    handlers::store_file::handle(file_args("n.md", "first", "a"), &stores).await.unwrap();
    let mut second = file_args("n.md", "second", "b");
    second.tags = vec!["v2".into()];
    second.content_type = "text/markdown".into();
    handlers::store_file::handle(second, &stores).await.unwrap();

    let value = parse(
        &handlers::get_file::handle(GetFileArgs { filename: "n.md".into() }, &stores)
            .await
            .unwrap(),
    );
    assert_eq!(value["content"], "second");
    assert_eq!(value["source"], "b");
    assert_eq!(value["tags"], json!(["v2"]));
    assert_eq!(value["contentType"], "text/markdown");
}

#[tokio::test]
async fn get_missing_file_is_not_found() {
    let stores = Stores::in_memory();
    let err = handlers::get_file::handle(GetFileArgs { filename: "missing.txt".into() }, &stores)
        .await
        .unwrap_err();
    assert_eq!(err, ToolError::NotFound("File not found: missing.txt".into()));
}

#[tokio::test]
async fn list_files_respects_prefix_and_limit() {
    let stores = Stores::in_memory();
    for name in ["x.txt", "y.txt", "x2.txt", "x3.txt"] {
        handlers::store_file::handle(file_args(name, "data", "s"), &stores).await.unwrap();
    }

    let value = parse(
        &handlers::list_files::handle(ListFilesArgs { prefix: Some("x".into()), limit: 20 }, &stores)
            .await
            .unwrap(),
    );
    let names: Vec<&str> = value["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["x.txt", "x2.txt", "x3.txt"]);
    assert_eq!(value["files"][0]["size"], 4);
    assert_eq!(value["files"][0]["metadata"]["source"], "s");

    let limited = parse(
        &handlers::list_files::handle(ListFilesArgs { prefix: None, limit: 2 }, &stores)
            .await
            .unwrap(),
    );
    assert_eq!(limited["count"], 2);
}

// ---------------------------------------------------------------------------
// Same flows against the on-disk adapters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disk_adapters_search_and_files() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = disk_stores(tmp.path());

    handlers::store_context::handle(context_args("Harvey likes lists", &["harvey"], "test"), &stores)
        .await
        .unwrap();
    handlers::store_context::handle(context_args("Other note", &["misc"], "test"), &stores)
        .await
        .unwrap();

    let value = parse(
        &handlers::search_contexts::handle(search(Some("Harvey"), None, None, 10), &stores)
            .await
            .unwrap(),
    );
    assert_eq!(value["count"], 1);
    assert_eq!(value["contexts"][0]["tags"], json!(["harvey"]));

    let recent = parse(
        &handlers::recent_contexts::handle(RecentContextsArgs { limit: 1, source: None }, &stores)
            .await
            .unwrap(),
    );
    assert_eq!(recent["contexts"][0]["content"], "Other note");

    handlers::store_file::handle(file_args("x.txt", "hello", "s"), &stores).await.unwrap();
    handlers::store_file::handle(file_args("y.txt", "world", "s"), &stores).await.unwrap();

    let file = parse(
        &handlers::get_file::handle(GetFileArgs { filename: "x.txt".into() }, &stores)
            .await
            .unwrap(),
    );
    assert_eq!(file["content"], "hello");
    assert_eq!(file["contentType"], "text/plain");

    let listing = parse(
        &handlers::list_files::handle(ListFilesArgs { prefix: Some("x".into()), limit: 20 }, &stores)
            .await
            .unwrap(),
    );
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["files"][0]["name"], "x.txt");
}

#[tokio::test]
async fn disk_store_file_rejects_traversal() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = disk_stores(tmp.path());

    for attempt in ["../escape.txt", "/etc/passwd", "a/../../b", "\\windows\\path"] {
        let err = handlers::store_file::handle(file_args(attempt, "x", "s"), &stores)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ToolError::BadArgument(_)),
            "'{attempt}' should be rejected, got {err:?}"
        );
    }
}

#[tokio::test]
async fn disk_files_keep_working_when_names_collide_with_sidecars() {
    let tmp = tempfile::tempdir().unwrap();
    let stores = disk_stores(tmp.path());

    for name in ["notes", "notes.json/x", "docs", "docs/a.txt"] {
        handlers::store_file::handle(file_args(name, name, "s"), &stores)
            .await
            .unwrap();
    }

    for name in ["notes", "notes.json/x", "docs", "docs/a.txt"] {
        let file = parse(
            &handlers::get_file::handle(GetFileArgs { filename: name.into() }, &stores)
                .await
                .unwrap(),
        );
        assert_eq!(file["content"], name);
    }

    let listing = parse(
        &handlers::list_files::handle(ListFilesArgs { prefix: None, limit: 20 }, &stores)
            .await
            .unwrap(),
    );
    let names: Vec<&str> = listing["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["docs", "docs/a.txt", "notes", "notes.json/x"]);
}
