//! Shared context and file store for AI agents.
//!
//! Exposes `store_context`, `search_contexts`, `get_recent_contexts`,
//! `store_file`, `get_file`, and `list_files` as MCP tools over a single
//! JSON-RPC 2.0 HTTP endpoint. Storage is pluggable: SQLite plus a local
//! directory in production, in-memory fakes in tests.

pub mod config;
pub mod handlers;
pub mod model;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod storage;

pub mod schema;
