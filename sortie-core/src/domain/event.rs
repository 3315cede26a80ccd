//! Object event classification
//!
//! Every change notification is classified purely from the shape of its key.
//! Classification has no side effects so the routing rules can be tested on
//! their own; the controller dispatches on the resulting variant.

use serde::Serialize;

use super::layout::{FROZEN_MANIFEST_NAME, MANIFEST_KEY};

/// What a changed object means to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectEvent {
    /// `manifest.json` was written: start a new job
    JobStart,

    /// A result object landed under `jobs/<job>/results/`
    ResultUploaded { job_name: String },

    /// A node asked to be terminated via `jobs/<job>/.../terminate/<instance>`
    TerminateRequested {
        job_name: String,
        instance_id: String,
    },

    /// Anything else
    Ignored,
}

impl ObjectEvent {
    /// Short label used in logs and batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectEvent::JobStart => "job_start",
            ObjectEvent::ResultUploaded { .. } => "result_uploaded",
            ObjectEvent::TerminateRequested { .. } => "terminate_requested",
            ObjectEvent::Ignored => "ignored",
        }
    }
}

/// Classifies a key; the first matching rule wins
pub fn classify(key: &str) -> ObjectEvent {
    if key == MANIFEST_KEY {
        return ObjectEvent::JobStart;
    }

    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 4 || segments[0] != "jobs" || segments.iter().any(|s| s.is_empty()) {
        return ObjectEvent::Ignored;
    }

    let job_name = segments[1].to_string();

    if segments[2] == "results" && !key.ends_with(FROZEN_MANIFEST_NAME) {
        return ObjectEvent::ResultUploaded { job_name };
    }

    if segments[segments.len() - 2] == "terminate" {
        let instance_id = segments[segments.len() - 1].to_string();
        return ObjectEvent::TerminateRequested {
            job_name,
            instance_id,
        };
    }

    ObjectEvent::Ignored
}
