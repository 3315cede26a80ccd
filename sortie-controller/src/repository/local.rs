//! Local filesystem object store
//!
//! Stores each bucket as a directory under a root and each object as a file at
//! its key path. Writes go through a staging directory and are moved into place
//! so readers never observe a partial object.
//!
//! Limitations:
//! - A key cannot also be a "directory" of other keys (`a/b` and `a/b/c`)
//! - Single node only; concurrent controllers must share the same filesystem

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::signing::LinkSigner;
use super::store::{ObjectPage, ObjectStore, ObjectSummary, StoreError, StoredObject};

/// Default number of keys returned per listing page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const STAGING_DIR: &str = ".staging";

/// Filesystem-backed object store
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
    signer: LinkSigner,
}

impl LocalObjectStore {
    /// Opens (and creates if needed) a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, signer: LinkSigner) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR))?;

        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
            signer,
        })
    }

    /// Overrides the listing page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        if bucket.is_empty() || bucket.starts_with('.') || bucket.contains(['/', '\\']) {
            return Err(StoreError::InvalidBucket(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }

    /// Writes `body` to a fresh staging file and returns its path
    async fn stage(&self, body: &[u8]) -> Result<PathBuf, StoreError> {
        let staged = self.root.join(STAGING_DIR).join(Uuid::new_v4().to_string());
        tokio::fs::write(&staged, body).await?;
        Ok(staged)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let path = self.object_path(bucket, key)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            // Deleted between stat and read
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredObject {
            body,
            last_modified: modified_at(&metadata),
        }))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        ensure_parent(&path).await?;

        let staged = self.stage(&body).await?;
        if let Err(e) = tokio::fs::rename(&staged, &path).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e.into());
        }

        tracing::debug!("Stored {}/{} ({} bytes)", bucket, key, body.len());
        Ok(())
    }

    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<bool, StoreError> {
        let path = self.object_path(bucket, key)?;
        ensure_parent(&path).await?;

        // link(2) fails atomically when the destination exists
        let staged = self.stage(&body).await?;
        let linked = tokio::fs::hard_link(&staged, &path).await;
        let _ = tokio::fs::remove_file(&staged).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        if let Some(token) = &continuation {
            if !token.starts_with(prefix) {
                return Err(StoreError::InvalidToken(token.clone()));
            }
        }

        let bucket_dir = self.bucket_dir(bucket)?;

        // Only walk the directory the prefix points into
        let (dir_part, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        if !dir_part.is_empty() {
            validate_key(dir_part)?;
        }

        let start = bucket_dir.join(dir_part);
        let base = dir_part.to_string();
        let mut keys = tokio::task::spawn_blocking(move || walk(&start, &base))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        keys.retain(|object| object.key.starts_with(prefix));
        keys.sort_by(|a, b| a.key.cmp(&b.key));

        let mut remaining: Vec<ObjectSummary> = match &continuation {
            Some(after) => keys.into_iter().filter(|o| o.key.as_str() > after.as_str()).collect(),
            None => keys,
        };

        let next_token = if remaining.len() > self.page_size {
            remaining.truncate(self.page_size);
            remaining.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: remaining,
            next_token,
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        self.object_path(bucket, key)?;
        Ok(self.signer.sign(bucket, key, expires_in, Utc::now()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Rejects keys that would escape the bucket directory
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn modified_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Recursively collects every file under `dir`, keyed relative to the bucket
fn walk(dir: &Path, key_base: &str) -> Result<Vec<ObjectSummary>, StoreError> {
    let mut out = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::NotADirectory => {
            return Ok(out);
        }
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        let key = if key_base.is_empty() {
            name
        } else {
            format!("{}/{}", key_base, name)
        };

        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            out.extend(walk(&entry.path(), &key)?);
        } else if metadata.is_file() {
            out.push(ObjectSummary {
                key,
                size: metadata.len(),
                last_modified: modified_at(&metadata),
            });
        }
    }

    Ok(out)
}
