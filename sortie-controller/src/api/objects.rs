//! Download API Handler
//!
//! Serves result objects through the time-limited links written into
//! aggregate records.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::SharedState;
use crate::api::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET /objects/{bucket}/{*key}
/// Download an object with a signed link
pub async fn download_object(
    State(state): State<SharedState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(link): Query<LinkQuery>,
) -> ApiResult<Response> {
    if !state
        .signer
        .verify(&bucket, &key, link.expires, &link.signature, Utc::now())
    {
        tracing::debug!("Rejected link for {}/{}", bucket, key);
        return Err(ApiError::Forbidden("Invalid or expired link".to_string()));
    }

    let object = state
        .context
        .store
        .get_object(&bucket, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Object {}/{} not found", bucket, key)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        object.body,
    )
        .into_response())
}
