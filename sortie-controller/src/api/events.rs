//! Notification API Handler
//!
//! Entry point for object-store change notifications. Each request is one
//! stateless invocation bounded by the configured wall-clock budget.

use axum::{Json, body::Bytes, extract::State};
use sortie_core::dto::notification::NotificationBatch;

use super::SharedState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::dispatch::{self, BatchReport};

/// POST /events
/// Process a batch of change notifications
pub async fn receive_events(
    State(state): State<SharedState>,
    body: Bytes,
) -> ApiResult<Json<BatchReport>> {
    let batch = NotificationBatch::from_json(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid notification document: {}", e)))?;

    tracing::debug!("Received batch of {} records", batch.records.len());

    // Abandoned mid-flight on overrun; redelivery re-runs the handlers from the top
    let report = tokio::time::timeout(
        state.invocation_timeout,
        dispatch::dispatch_batch(&state.context, &batch),
    )
    .await
    .map_err(|_| {
        ApiError::Timeout(format!(
            "batch of {} records exceeded {:?}",
            batch.records.len(),
            state.invocation_timeout
        ))
    })?;

    Ok(Json(report))
}
