use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::{BlobStore, Limit, StorageError};
use crate::model::{format_timestamp, CustomMetadata, FileEntry, StoredFile};

const BLOBS_DIR: &str = "blobs";
const META_DIR: &str = "meta";
const TMP_DIR: &str = "tmp";
const META_SUFFIX: &str = ".json";

/// Sidecar written next to every blob.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    content_type: String,
    custom_metadata: CustomMetadata,
}

/// Blob store laid out on a local directory.
///
/// The key namespace is flat: `/`, `\` and `%` are percent-encoded, so every
/// key maps to a single file name. Payloads live under `<root>/blobs/<name>`,
/// metadata under `<root>/meta/<name>.json`. Writes go through `<root>/tmp`
/// and are renamed into place.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    // Keeps a payload and its sidecar paired across concurrent puts.
    lock: Arc<RwLock<()>>,
}

impl FsBlobStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        for dir in [BLOBS_DIR, META_DIR, TMP_DIR] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            lock: Arc::new(RwLock::new(())),
        })
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(BLOBS_DIR).join(encode_key(key)))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self
            .root
            .join(META_DIR)
            .join(format!("{}{META_SUFFIX}", encode_key(key))))
    }

    /// A sidecar that is missing or unreadable counts as absent.
    fn read_sidecar(&self, key: &str) -> Option<Sidecar> {
        let path = self.meta_path(key).ok()?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read sidecar: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                tracing::warn!(path = %path.display(), "malformed sidecar: {e}");
                None
            }
        }
    }

    /// Write `bytes` to a temp file and rename it over `path`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let mut tmp = NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Canonicalize and verify the path stays under the blobs directory.
    fn contained(&self, path: &Path) -> Result<bool, StorageError> {
        let root = self.root.join(BLOBS_DIR).canonicalize()?;
        match path.canonicalize() {
            Ok(canonical) => Ok(canonical.starts_with(&root)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject keys that are empty, absolute, or walk out of the store.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("filename must not be empty".into()));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "filename must be relative: {key}"
        )));
    }
    let bad_segment = key
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment {
        return Err(StorageError::InvalidKey(format!(
            "filename contains an invalid path segment: {key}"
        )));
    }
    Ok(())
}

/// Map a key onto one path component.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`encode_key`]. Returns `None` for names it never produces.
fn decode_key(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos + 1..pos + 3)?;
        out.push(match escape {
            "25" => '%',
            "2F" => '/',
            "5C" => '\\',
            _ => return None,
        });
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Some(out)
}

fn default_metadata() -> CustomMetadata {
    CustomMetadata {
        source: String::new(),
        tags: "[]".into(),
        upload_time: String::new(),
    }
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &CustomMetadata,
    ) -> Result<(), StorageError> {
        let blob_path = self.blob_path(key)?;
        let meta_path = self.meta_path(key)?;
        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            custom_metadata: metadata.clone(),
        };
        let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)?;

        let _guard = self.write_guard();
        // The payload decides whether a file exists, so it lands last.
        self.write_atomic(&meta_path, &sidecar_bytes)?;
        self.write_atomic(&blob_path, bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoredFile>, StorageError> {
        let path = self.blob_path(key)?;
        let _guard = self.read_guard();
        if !path.is_file() || !self.contained(&path)? {
            return Ok(None);
        }

        let content = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (content_type, metadata) = match self.read_sidecar(key) {
            Some(sidecar) => (sidecar.content_type, sidecar.custom_metadata),
            None => ("application/octet-stream".to_string(), default_metadata()),
        };

        Ok(Some(StoredFile {
            filename: key.to_string(),
            content_type,
            content,
            metadata,
        }))
    }

    fn list(&self, prefix: Option<&str>, limit: Limit) -> Result<Vec<FileEntry>, StorageError> {
        let blobs_root = self.root.join(BLOBS_DIR);
        let _guard = self.read_guard();
        let mut keyed: Vec<(String, PathBuf)> = Vec::new();

        let walker = WalkDir::new(&blobs_root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = entry.file_name().to_str().and_then(decode_key) else {
                tracing::warn!(path = %entry.path().display(), "skipping unrecognised blob name");
                continue;
            };
            if prefix.map_or(true, |p| key.starts_with(p)) {
                keyed.push((key, entry.into_path()));
            }
        }

        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::new();
        for (key, path) in keyed {
            if limit.get().is_some_and(|n| entries.len() >= n) {
                break;
            }
            let meta = match std::fs::metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(%key, "skipping unreadable blob: {e}");
                    continue;
                }
            };
            let modified = meta
                .modified()
                .map(|t| format_timestamp(DateTime::<Utc>::from(t)))
                .unwrap_or_default();
            let metadata = self
                .read_sidecar(&key)
                .map(|s| s.custom_metadata)
                .unwrap_or_else(default_metadata);
            entries.push(FileEntry {
                name: key,
                size: meta.len(),
                modified,
                metadata,
            });
        }

        Ok(entries)
    }
}

