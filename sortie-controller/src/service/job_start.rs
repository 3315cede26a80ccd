//! Job Start Handler
//!
//! Runs when `manifest.json` is written. Freezes the manifest under the job's
//! own prefix, publishes the compiled startup script and cycles the fleet so a
//! fresh generation of nodes picks both up.

use sortie_core::compiler;
use sortie_core::domain::layout::{JobKeys, MANIFEST_KEY, STARTUP_SCRIPT_KEY};
use sortie_core::domain::manifest::Manifest;

use super::HandlerError;
use crate::context::Context;

/// What a job start did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStarted {
    pub job_name: String,
    /// False when the frozen record already existed (redelivery)
    pub newly_frozen: bool,
    pub capacity: u32,
}

/// Starts the job described by the bucket's current manifest
pub async fn start_job(ctx: &Context, bucket: &str) -> Result<JobStarted, HandlerError> {
    let manifest_object = ctx
        .store
        .get_object(bucket, MANIFEST_KEY)
        .await?
        .ok_or_else(|| HandlerError::missing(bucket, MANIFEST_KEY))?;

    let manifest = Manifest::from_json(&manifest_object.body)?;
    let keys = JobKeys::new(&manifest.job_name);
    let frozen_key = keys.frozen_manifest();

    // Freeze first: a reused job name must not clobber the running script
    let newly_frozen = ctx
        .store
        .put_object_if_absent(bucket, &frozen_key, manifest_object.body.clone())
        .await?;

    if !newly_frozen {
        let existing = ctx.store.get_object(bucket, &frozen_key).await?;
        if existing.is_some_and(|frozen| frozen.body != manifest_object.body) {
            return Err(HandlerError::JobNameReused(manifest.job_name));
        }
        tracing::info!(
            "Job {} already frozen with identical manifest, re-applying",
            manifest.job_name
        );
    }

    let script = compiler::compile(&manifest, bucket);
    ctx.store
        .put_object(bucket, STARTUP_SCRIPT_KEY, script.text.into_bytes())
        .await?;

    tracing::info!(
        "Compiled startup script for job {} ({} checkpoints)",
        manifest.job_name,
        script.checkpoints.len()
    );

    // Down first so no node from a previous job survives into this one
    ctx.fleet.scale_to(0).await?;
    let capacity = ctx.fleet.scale_to_max().await?;

    tracing::info!(
        "Job {} started, pool {} scaled to {}",
        manifest.job_name,
        ctx.fleet.pool(),
        capacity
    );

    Ok(JobStarted {
        job_name: manifest.job_name,
        newly_frozen,
        capacity,
    })
}
