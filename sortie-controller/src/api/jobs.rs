//! Job API Handlers
//!
//! Operator endpoints for inspecting and cleaning up jobs in the data bucket.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use super::SharedState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::maintenance::{self, JobStatus};

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub job_name: String,
    pub deleted: usize,
}

/// GET /jobs/{job}
/// Progress of a job
pub async fn get_job(
    State(state): State<SharedState>,
    Path(job): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    validate_job_name(&job)?;
    tracing::debug!("Getting status of job: {}", job);

    let status = maintenance::job_status(&state.context, &state.data_bucket, &job).await?;
    Ok(Json(status))
}

/// DELETE /jobs/{job}/results
/// Delete a job's results so it can run again
pub async fn clear_results(
    State(state): State<SharedState>,
    Path(job): Path<String>,
) -> ApiResult<Json<Deleted>> {
    validate_job_name(&job)?;

    let deleted = maintenance::clear_results(&state.context, &state.data_bucket, &job).await?;
    Ok(Json(Deleted {
        job_name: job,
        deleted,
    }))
}

/// DELETE /jobs/{job}
/// Delete every object belonging to a job
pub async fn erase_job(
    State(state): State<SharedState>,
    Path(job): Path<String>,
) -> ApiResult<Json<Deleted>> {
    validate_job_name(&job)?;

    let deleted = maintenance::erase_job(&state.context, &state.data_bucket, &job).await?;
    Ok(Json(Deleted {
        job_name: job,
        deleted,
    }))
}

/// POST /jobs/{job}/abort
/// Scale the fleet down and erase the job
pub async fn abort_job(
    State(state): State<SharedState>,
    Path(job): Path<String>,
) -> ApiResult<Json<Deleted>> {
    validate_job_name(&job)?;

    let deleted = maintenance::abort_job(&state.context, &state.data_bucket, &job).await?;
    Ok(Json(Deleted {
        job_name: job,
        deleted,
    }))
}

fn validate_job_name(job: &str) -> ApiResult<()> {
    if job.is_empty() || job.contains('/') || job.chars().any(char::is_whitespace) {
        return Err(ApiError::BadRequest(format!("Invalid job name '{}'", job)));
    }
    Ok(())
}
