//! In-memory adapters, used in tests and for throwaway servers.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{BlobStore, ContextFilter, ContextStore, Limit, StorageError};
use crate::model::{format_timestamp, ContextRow, CustomMetadata, FileEntry, StoredFile};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryContextStore {
    rows: Mutex<Vec<ContextRow>>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryContextStore {
    fn insert(&self, row: &ContextRow) -> Result<(), StorageError> {
        lock(&self.rows).push(row.clone());
        Ok(())
    }

    fn query(&self, filter: &ContextFilter, limit: Limit) -> Result<Vec<ContextRow>, StorageError> {
        let rows = lock(&self.rows);
        // Newest insertion first, then a stable sort keeps that order among equal timestamps.
        let mut matched: Vec<&ContextRow> = rows.iter().rev().filter(|r| filter.matches(r)).collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(limit.apply(matched.into_iter().cloned()))
    }
}

#[derive(Debug, Clone)]
struct MemoryBlob {
    file: StoredFile,
    modified: String,
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, MemoryBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &CustomMetadata,
    ) -> Result<(), StorageError> {
        let blob = MemoryBlob {
            file: StoredFile {
                filename: key.to_string(),
                content_type: content_type.to_string(),
                content: bytes.to_vec(),
                metadata: metadata.clone(),
            },
            modified: format_timestamp(Utc::now()),
        };
        lock(&self.blobs).insert(key.to_string(), blob);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredFile>, StorageError> {
        Ok(lock(&self.blobs).get(key).map(|blob| blob.file.clone()))
    }

    fn list(&self, prefix: Option<&str>, limit: Limit) -> Result<Vec<FileEntry>, StorageError> {
        let blobs = lock(&self.blobs);
        let entries = blobs
            .values()
            .filter(|blob| prefix.map_or(true, |p| blob.file.filename.starts_with(p)))
            .map(|blob| FileEntry {
                name: blob.file.filename.clone(),
                size: blob.file.content.len() as u64,
                modified: blob.modified.clone(),
                metadata: blob.file.metadata.clone(),
            });
        Ok(limit.apply(entries))
    }
}
