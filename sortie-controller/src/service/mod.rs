//! Service Module
//!
//! Notification handlers and job maintenance. Services combine the
//! repositories through a [`Context`](crate::context::Context) and contain all
//! of the controller's decision making.

pub mod completion;
pub mod dispatch;
pub mod fleet;
pub mod job_start;
pub mod maintenance;
pub mod summary;
pub mod termination;

use sortie_core::domain::manifest::ManifestError;
use thiserror::Error;

use crate::repository::{FleetError, StoreError};

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("object {bucket}/{key} does not exist")]
    MissingObject { bucket: String, key: String },

    #[error(transparent)]
    InvalidManifest(#[from] ManifestError),

    #[error("job name '{0}' is already used by a different manifest")]
    JobNameReused(String),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("fleet error: {0}")]
    Fleet(#[from] FleetError),
}

impl HandlerError {
    pub(crate) fn missing(bucket: &str, key: &str) -> Self {
        HandlerError::MissingObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}
