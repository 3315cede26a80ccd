//! Completion Detector
//!
//! Runs on every result upload. Completion is recomputed from scratch each
//! time: the frozen manifest gives the target, a full listing of the results
//! prefix gives the count. Notifications may be duplicated or reordered, so
//! no counter is kept anywhere.

use chrono::Utc;
use sortie_core::domain::aggregate::{AggregateRecord, ResultLink};
use sortie_core::domain::layout::JobKeys;
use sortie_core::domain::manifest::Manifest;

use super::HandlerError;
use super::summary;
use crate::context::Context;
use crate::repository::list_all;

/// Result of one completion check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Aggregate record was already present
    AlreadyFinished,

    /// Fewer results than the target
    InProgress { results: u64, target: u64 },

    /// This invocation wrote the aggregate record
    Finished { links: usize },

    /// Target met, but a concurrent invocation wrote the aggregate first
    LostRace,
}

/// Checks whether `job_name` has produced enough results and finishes it if so
pub async fn check_completion(
    ctx: &Context,
    bucket: &str,
    job_name: &str,
) -> Result<Completion, HandlerError> {
    let keys = JobKeys::new(job_name);

    // The frozen record, never manifest.json: that may already be the next job
    let frozen_key = keys.frozen_manifest();
    let frozen = ctx
        .store
        .get_object(bucket, &frozen_key)
        .await?
        .ok_or_else(|| HandlerError::missing(bucket, &frozen_key))?;
    let manifest = Manifest::from_json(&frozen.body)?;
    let target = manifest.number_of_batches;

    let aggregate_key = keys.aggregate();
    let mut overwrite = false;
    if let Some(existing) = ctx.store.get_object(bucket, &aggregate_key).await? {
        if AggregateRecord::marks_completion(&existing.body) {
            tracing::debug!("Job {} already finished, repeating scale-down", job_name);
            ctx.fleet.scale_to(0).await?;
            return Ok(Completion::AlreadyFinished);
        }
        tracing::warn!("Aggregate record for job {} is corrupt, rebuilding", job_name);
        overwrite = true;
    }

    let results: Vec<_> = list_all(ctx.store.as_ref(), bucket, &keys.results_prefix())
        .await?
        .into_iter()
        .filter(|object| object.key != aggregate_key)
        .collect();
    let count = results.len() as u64;

    if count < target {
        tracing::info!("Job {}: {}/{} results", job_name, count, target);
        return Ok(Completion::InProgress {
            results: count,
            target,
        });
    }

    tracing::info!("Job {}: goal of {} results met, tearing down", job_name, target);
    ctx.fleet.scale_to(0).await?;

    let mut links = Vec::with_capacity(results.len());
    for object in results {
        let url = ctx
            .store
            .presign_get(bucket, &object.key, ctx.link_ttl)
            .await?;
        links.push(ResultLink {
            key: object.key,
            url,
        });
    }
    let record = AggregateRecord::from_links(links);

    if overwrite {
        ctx.store
            .put_object(bucket, &aggregate_key, record.to_json())
            .await?;
    } else if !ctx
        .store
        .put_object_if_absent(bucket, &aggregate_key, record.to_json())
        .await?
    {
        tracing::info!("Aggregate record for job {} written concurrently", job_name);
        return Ok(Completion::LostRace);
    }

    if let Some(notifier) = &ctx.notifier {
        let message = summary::compose(
            job_name,
            &ctx.cluster_name,
            frozen.last_modified,
            Utc::now(),
            record.links(),
            ctx.link_ttl,
        );
        if let Err(e) = notifier.send(&message.subject, &message.body).await {
            tracing::warn!("Failed to send summary for job {}: {}", job_name, e);
        }
    }

    Ok(Completion::Finished {
        links: record.len(),
    })
}
