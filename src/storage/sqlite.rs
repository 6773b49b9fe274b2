use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection};

use super::{ContextFilter, ContextStore, Limit, StorageError};
use crate::model::ContextRow;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contexts (
    id        TEXT PRIMARY KEY,
    content   TEXT NOT NULL,
    tags      TEXT NOT NULL,
    source    TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    metadata  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_contexts_timestamp ON contexts(timestamp);
CREATE INDEX IF NOT EXISTS idx_contexts_source ON contexts(source);
";

/// Context row store backed by a SQLite file.
///
/// Each operation opens its own connection, so the store holds no handle
/// between calls.
#[derive(Debug, Clone)]
pub struct SqliteContextStore {
    path: PathBuf,
}

impl SqliteContextStore {
    /// Open (creating if needed) the database file and its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self { path };
        store.connect()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        Ok(Connection::open(&self.path)?)
    }
}

/// Escape `LIKE` wildcards so the needle is matched literally.
fn like_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

impl ContextStore for SqliteContextStore {
    fn insert(&self, row: &ContextRow) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO contexts (id, content, tags, source, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![row.id, row.content, row.tags, row.source, row.timestamp, row.metadata],
        )?;
        Ok(())
    }

    fn query(&self, filter: &ContextFilter, limit: Limit) -> Result<Vec<ContextRow>, StorageError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(needle) = &filter.content_contains {
            clauses.push("content LIKE ? ESCAPE '\\'".into());
            values.push(like_escape(needle));
        }

        if let Some(source) = &filter.source {
            clauses.push("source = ?".into());
            values.push(source.clone());
        }

        if !filter.any_tag_patterns.is_empty() {
            let alternatives: Vec<&str> = filter
                .any_tag_patterns
                .iter()
                .map(|_| "tags LIKE ? ESCAPE '\\'")
                .collect();
            clauses.push(format!("({})", alternatives.join(" OR ")));
            values.extend(filter.any_tag_patterns.iter().map(|p| like_escape(p)));
        }

        let mut sql = String::from(
            "SELECT id, content, tags, source, timestamp, metadata FROM contexts",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY timestamp DESC, rowid DESC LIMIT {}",
            limit.as_sql()
        ));

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ContextRow {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    tags: row.get(2)?,
                    source: row.get(3)?,
                    timestamp: row.get(4)?,
                    metadata: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
