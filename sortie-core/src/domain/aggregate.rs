//! Aggregate record
//!
//! Written once per job when the completion target is met. Its presence is the
//! completion flag; its body is the list of time-limited links to every result.

use serde::{Deserialize, Serialize};

/// Links to every result object of a finished job, ordered by result key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateRecord {
    links: Vec<String>,
}

/// A result object and the download link generated for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLink {
    pub key: String,
    pub url: String,
}

impl AggregateRecord {
    /// Builds the record, sorting entries by result key
    pub fn from_links(mut links: Vec<ResultLink>) -> Self {
        links.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            links: links.into_iter().map(|link| link.url).collect(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Completion check on a stored record: any valid JSON body counts
    pub fn marks_completion(bytes: &[u8]) -> bool {
        serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
    }

    pub fn to_json(&self) -> Vec<u8> {
        // A Vec<String> always serializes
        serde_json::to_vec_pretty(&self.links).unwrap_or_default()
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
