//! Storage collaborators: a keyed row store for contexts and a blob store
//! for files.
//!
//! Both traits are synchronous. Handlers call them from
//! `tokio::task::spawn_blocking`.

pub mod fs;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use crate::model::{ContextRow, CustomMetadata, FileEntry, StoredFile};

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryContextStore};
pub use sqlite::SqliteContextStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("directory walk: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{0}")]
    InvalidKey(String),
}

/// Caller-supplied result cap. Negative requests mean "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(Option<usize>);

impl Limit {
    pub fn from_requested(requested: i64) -> Self {
        if requested < 0 {
            Self(None)
        } else {
            Self(Some(usize::try_from(requested).unwrap_or(usize::MAX)))
        }
    }

    pub fn unbounded() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<usize> {
        self.0
    }

    /// SQLite `LIMIT` operand; `-1` is unbounded.
    pub fn as_sql(&self) -> i64 {
        match self.0 {
            Some(n) => i64::try_from(n).unwrap_or(i64::MAX),
            None => -1,
        }
    }

    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        match self.0 {
            Some(n) => items.take(n).collect(),
            None => items.collect(),
        }
    }
}

/// Row-level predicate over stored contexts.
///
/// All populated fields are conjoined; `any_tag_patterns` matches when at
/// least one pattern occurs in the serialized tags text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFilter {
    pub content_contains: Option<String>,
    pub source: Option<String>,
    pub any_tag_patterns: Vec<String>,
}

impl ContextFilter {
    /// Case-sensitive evaluation used by the in-memory store.
    pub fn matches(&self, row: &ContextRow) -> bool {
        if let Some(needle) = &self.content_contains {
            if !row.content.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if &row.source != source {
                return false;
            }
        }
        if !self.any_tag_patterns.is_empty()
            && !self
                .any_tag_patterns
                .iter()
                .any(|pattern| row.tags.contains(pattern.as_str()))
        {
            return false;
        }
        true
    }
}

/// Keyed row store holding contexts.
///
/// `query` returns rows newest first by `timestamp`, ties broken by
/// insertion order (newest first).
pub trait ContextStore: Send + Sync {
    fn insert(&self, row: &ContextRow) -> Result<(), StorageError>;
    fn query(&self, filter: &ContextFilter, limit: Limit) -> Result<Vec<ContextRow>, StorageError>;
}

/// Blob store keyed by filename. `put` overwrites unconditionally.
pub trait BlobStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &CustomMetadata,
    ) -> Result<(), StorageError>;
    fn get(&self, key: &str) -> Result<Option<StoredFile>, StorageError>;
    /// Entries in ascending key order, optionally restricted to a key prefix.
    fn list(&self, prefix: Option<&str>, limit: Limit) -> Result<Vec<FileEntry>, StorageError>;
}

/// Storage handles passed explicitly into the dispatcher.
#[derive(Clone)]
pub struct Stores {
    pub contexts: Arc<dyn ContextStore>,
    pub files: Arc<dyn BlobStore>,
}

impl Stores {
    pub fn new(contexts: Arc<dyn ContextStore>, files: Arc<dyn BlobStore>) -> Self {
        Self { contexts, files }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryContextStore::new()),
            Arc::new(MemoryBlobStore::new()),
        )
    }
}
