//! Job maintenance
//!
//! Operator actions on a job's objects: inspect progress, clear results so the
//! job can be re-run, erase the job entirely, or abort it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sortie_core::domain::aggregate::AggregateRecord;
use sortie_core::domain::layout::JobKeys;
use sortie_core::domain::manifest::Manifest;

use super::HandlerError;
use crate::context::Context;
use crate::repository::list_all;

/// Progress of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub job_name: String,
    pub target: u64,
    pub result_count: u64,
    pub finished: bool,
    /// When the manifest was frozen
    pub started_at: DateTime<Utc>,
    /// Instances currently in the pool; absent when the fleet is unreachable
    pub pool_size: Option<u32>,
}

pub async fn job_status(ctx: &Context, bucket: &str, job_name: &str) -> Result<JobStatus, HandlerError> {
    let keys = JobKeys::new(job_name);
    let frozen_key = keys.frozen_manifest();

    let frozen = ctx
        .store
        .get_object(bucket, &frozen_key)
        .await?
        .ok_or_else(|| HandlerError::missing(bucket, &frozen_key))?;
    let manifest = Manifest::from_json(&frozen.body)?;

    let aggregate_key = keys.aggregate();
    let finished = ctx
        .store
        .get_object(bucket, &aggregate_key)
        .await?
        .is_some_and(|record| AggregateRecord::marks_completion(&record.body));

    let result_count = list_all(ctx.store.as_ref(), bucket, &keys.results_prefix())
        .await?
        .iter()
        .filter(|object| object.key != aggregate_key)
        .count() as u64;

    let pool_size = match ctx.fleet.current_size().await {
        Ok(size) => Some(size),
        Err(e) => {
            tracing::warn!("Could not read size of pool {}: {}", ctx.fleet.pool(), e);
            None
        }
    };

    Ok(JobStatus {
        job_name: manifest.job_name,
        target: manifest.number_of_batches,
        result_count,
        finished,
        started_at: frozen.last_modified,
        pool_size,
    })
}

/// Deletes every result object, the aggregate record included, and unfreezes
/// the manifest so the next upload starts a fresh run
///
/// Returns the number of objects deleted.
pub async fn clear_results(ctx: &Context, bucket: &str, job_name: &str) -> Result<usize, HandlerError> {
    let keys = JobKeys::new(job_name);
    let mut deleted = delete_prefix(ctx, bucket, &keys.results_prefix()).await?;

    let frozen_key = keys.frozen_manifest();
    if ctx.store.get_object(bucket, &frozen_key).await?.is_some() {
        ctx.store.delete_object(bucket, &frozen_key).await?;
        deleted += 1;
    }

    tracing::info!("Cleared {} results of job {}", deleted, job_name);
    Ok(deleted)
}

/// Deletes every object under `jobs/<job>/`, frozen manifest included
pub async fn erase_job(ctx: &Context, bucket: &str, job_name: &str) -> Result<usize, HandlerError> {
    let prefix = JobKeys::new(job_name).job_prefix();
    let deleted = delete_prefix(ctx, bucket, &prefix).await?;

    tracing::info!("Erased job {} ({} objects)", job_name, deleted);
    Ok(deleted)
}

/// Stops the fleet and erases the job
pub async fn abort_job(ctx: &Context, bucket: &str, job_name: &str) -> Result<usize, HandlerError> {
    tracing::warn!("Aborting job {}", job_name);
    ctx.fleet.scale_to(0).await?;
    erase_job(ctx, bucket, job_name).await
}

async fn delete_prefix(ctx: &Context, bucket: &str, prefix: &str) -> Result<usize, HandlerError> {
    let objects = list_all(ctx.store.as_ref(), bucket, prefix).await?;
    for object in &objects {
        ctx.store.delete_object(bucket, &object.key).await?;
    }
    Ok(objects.len())
}
