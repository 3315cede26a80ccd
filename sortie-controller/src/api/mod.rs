//! API Module
//!
//! HTTP API layer for the controller.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod events;
pub mod health;
pub mod jobs;
pub mod objects;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::context::Context;
use crate::repository::LinkSigner;

/// State shared by every handler
pub struct AppState {
    pub context: Context,
    pub signer: LinkSigner,
    /// Bucket the job endpoints operate on
    pub data_bucket: String,
    pub invocation_timeout: Duration,
}

pub type SharedState = Arc<AppState>;

/// Create the main API router with all endpoints
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Notifications
        .route("/events", post(events::receive_events))
        // Signed downloads
        .route("/objects/{bucket}/{*key}", get(objects::download_object))
        // Job maintenance
        .route("/jobs/{job}", get(jobs::get_job))
        .route("/jobs/{job}", delete(jobs::erase_job))
        .route("/jobs/{job}/results", delete(jobs::clear_results))
        .route("/jobs/{job}/abort", post(jobs::abort_job))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
