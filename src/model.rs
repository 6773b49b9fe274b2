//! Value types shared between the tool handlers and the storage adapters.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::StorageError;

/// Render a UTC instant the way every stored timestamp is written.
///
/// Fixed microsecond precision keeps lexical order equal to time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A shared, immutable note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub source: String,
    pub timestamp: String,
    pub metadata: Map<String, Value>,
}

/// A context as the row store sees it: tags and metadata flattened to JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRow {
    pub id: String,
    pub content: String,
    pub tags: String,
    pub source: String,
    pub timestamp: String,
    pub metadata: String,
}

impl Context {
    pub fn to_row(&self) -> Result<ContextRow, StorageError> {
        Ok(ContextRow {
            id: self.id.clone(),
            content: self.content.clone(),
            tags: serde_json::to_string(&self.tags)?,
            source: self.source.clone(),
            timestamp: self.timestamp.clone(),
            metadata: serde_json::to_string(&self.metadata)?,
        })
    }

    pub fn from_row(row: ContextRow) -> Result<Self, StorageError> {
        Ok(Self {
            tags: serde_json::from_str(&row.tags)?,
            metadata: serde_json::from_str(&row.metadata)?,
            id: row.id,
            content: row.content,
            source: row.source,
            timestamp: row.timestamp,
        })
    }
}

/// Custom metadata attached to every stored file.
///
/// `tags` stays in its serialized JSON form, mirroring how blob stores keep
/// string-only metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadata {
    pub source: String,
    pub tags: String,
    pub upload_time: String,
}

impl CustomMetadata {
    /// Decoded tag list. Malformed text reads as no tags.
    pub fn parsed_tags(&self) -> Vec<String> {
        match serde_json::from_str(&self.tags) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(tags = %self.tags, "malformed file tags: {e}");
                Vec::new()
            }
        }
    }
}

/// A blob read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub metadata: CustomMetadata,
}

/// One row of a blob listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: String,
    pub metadata: CustomMetadata,
}
