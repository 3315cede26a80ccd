//! Object store
//!
//! The store is the single source of truth shared by the controller and every
//! node. Single-key reads, writes and deletes are atomic; nothing spans keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Object store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid bucket name: {0}")]
    InvalidBucket(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid continuation token: {0}")]
    InvalidToken(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An object body together with its storage timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

/// A listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    /// Present when more objects remain
    pub next_token: Option<String>,
}

/// Repository trait for object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object; `Ok(None)` when it does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StoreError>;

    /// Creates or overwrites an object
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Creates an object only if the key is free
    ///
    /// Returns `true` when this call created the object, `false` when the key
    /// already existed (the existing object is left untouched).
    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<bool, StoreError>;

    /// Deletes an object; deleting a missing key succeeds
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Lists one bounded page of keys under `prefix`, in key order
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, StoreError>;

    /// Generates a time-limited download link
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError>;
}

/// Lists every object under `prefix`, following continuation tokens until exhausted
pub async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ObjectSummary>, StoreError> {
    let mut objects = Vec::new();
    let mut token = None;

    loop {
        let page = store.list_objects(bucket, prefix, token).await?;
        objects.extend(page.objects);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(objects)
}
