//! Job manifest
//!
//! A manifest describes one flat job stage: download inputs, optionally install
//! dependencies once per node, run the commands `runs_per_node` times and upload
//! the produced files after every run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Not JSON, or a required field is missing or mistyped
    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed JSON that violates a manifest rule
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// Declarative description of a job
///
/// Field names on the wire are PascalCase (`JobName`, `FilesToDownload`, ...);
/// snake_case spellings are accepted as aliases. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    #[serde(alias = "job_name")]
    pub job_name: String,

    #[serde(alias = "files_to_download")]
    pub files_to_download: Vec<String>,

    #[serde(alias = "install_commands", default, skip_serializing_if = "Option::is_none")]
    pub install_commands: Option<Vec<String>>,

    #[serde(alias = "commands_to_run")]
    pub commands_to_run: Vec<String>,

    #[serde(alias = "runs_per_node", default = "default_runs_per_node")]
    pub runs_per_node: u32,

    #[serde(alias = "files_to_upload")]
    pub files_to_upload: Vec<String>,

    /// Completion target: result objects expected across the whole fleet
    #[serde(alias = "number_of_batches")]
    pub number_of_batches: u64,
}

fn default_runs_per_node() -> u32 {
    1
}

impl Manifest {
    /// Parses and validates a manifest document
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks the rules serde cannot express
    pub fn validate(&self) -> Result<(), ManifestError> {
        validate_job_name(&self.job_name)?;

        if self.runs_per_node == 0 {
            return Err(ManifestError::Invalid(
                "RunsPerNode must be at least 1".to_string(),
            ));
        }

        if self.number_of_batches == 0 {
            return Err(ManifestError::Invalid(
                "NumberOfBatches must be at least 1".to_string(),
            ));
        }

        if self.commands_to_run.is_empty() {
            return Err(ManifestError::Invalid(
                "CommandsToRun cannot be empty".to_string(),
            ));
        }

        if self.files_to_upload.is_empty() {
            return Err(ManifestError::Invalid(
                "FilesToUpload cannot be empty".to_string(),
            ));
        }

        for file in self.files_to_download.iter().chain(&self.files_to_upload) {
            validate_file_name(file)?;
        }

        Ok(())
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_job_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::Invalid("JobName cannot be empty".to_string()));
    }

    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(ManifestError::Invalid(format!(
            "JobName '{}' cannot contain '/' or whitespace",
            name
        )));
    }

    Ok(())
}

fn validate_file_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() || name.contains('/') {
        return Err(ManifestError::Invalid(format!(
            "file name '{}' must be a plain, non-empty name",
            name
        )));
    }
    Ok(())
}
