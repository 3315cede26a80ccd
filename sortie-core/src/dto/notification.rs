//! Object-store change notifications
//!
//! The store delivers batches of records at least once, in no particular order.
//! Only the bucket name and the object key matter to the controller.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// A batch of change notifications as delivered by the object store
///
/// Records are decoded one by one so a single malformed entry cannot reject
/// its siblings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationEntry>,
}

/// One entry of the `Records` array, kept raw when it is not a store record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationEntry {
    Record(NotificationRecord),
    Unrecognized(serde_json::Value),
}

/// One change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded object key
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A decoded `(bucket, key)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectChange {
    pub bucket: String,
    pub key: String,
}

impl NotificationRecord {
    /// Builds a record the way the store would deliver it
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_name: Some("ObjectCreated:Put".to_string()),
            s3: S3Entity {
                bucket: BucketEntity {
                    name: bucket.into(),
                },
                object: ObjectEntity {
                    key: key.into(),
                    size: None,
                },
            },
        }
    }

    /// Bucket and decoded key
    pub fn change(&self) -> ObjectChange {
        ObjectChange {
            bucket: self.s3.bucket.name.clone(),
            key: decode_key(&self.s3.object.key),
        }
    }
}

impl From<NotificationRecord> for NotificationEntry {
    fn from(record: NotificationRecord) -> Self {
        Self::Record(record)
    }
}

impl NotificationEntry {
    /// Bucket and decoded key, or why the entry carries none
    pub fn change(&self) -> Result<ObjectChange, serde_json::Error> {
        match self {
            Self::Record(record) => Ok(record.change()),
            // Re-decode to surface the field that is missing
            Self::Unrecognized(raw) => NotificationRecord::deserialize(raw).map(|r| r.change()),
        }
    }
}

impl NotificationBatch {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn changes(&self) -> Vec<Result<ObjectChange, serde_json::Error>> {
        self.records.iter().map(NotificationEntry::change).collect()
    }
}

/// Decodes a notification key: `+` is a space, `%XX` an escaped byte
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
