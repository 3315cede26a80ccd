//! Sortie Controller
//!
//! Event-driven controller for disposable batch fleets.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Repositories: object store, fleet gateway and notification webhook
//! - Services: notification routing and the job start, completion and
//!   termination handlers, plus job maintenance
//! - API: HTTP entry points for notifications, signed downloads and operators
//!
//! Every notification batch is handled as an independent invocation; all
//! coordination goes through the object store.
//!
//! Run without arguments to serve the HTTP API, or pass the path of a
//! notification document to process it once and exit.

mod api;
mod config;
mod context;
mod repository;
mod service;
#[cfg(test)]
mod testing;

use anyhow::{Context as _, Result};
use sortie_client::{FleetClient, NotifyClient};
use sortie_core::dto::notification::NotificationBatch;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::Config;
use crate::context::Context;
use crate::repository::{HttpFleet, LinkSigner, LocalObjectStore, WebhookNotifier};
use crate::service::dispatch;
use crate::service::fleet::FleetController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sortie_controller=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sortie Controller...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: cluster={}, pool={}, fleet_url={}",
        config.cluster_name, config.pool_name, config.fleet_url
    );

    let state = Arc::new(build_state(&config)?);

    match std::env::args().nth(1) {
        Some(path) => run_once(&state, &path).await,
        None => serve(&config, state).await,
    }
}

/// Wires the repositories and services described by `config`
fn build_state(config: &Config) -> Result<AppState> {
    let secret = match &config.link_signing_key {
        Some(key) => key.as_bytes().to_vec(),
        None => {
            warn!("LINK_SIGNING_KEY not set, download links will not survive a restart");
            [Uuid::new_v4().into_bytes(), Uuid::new_v4().into_bytes()].concat()
        }
    };
    let signer = LinkSigner::new(config.public_url.clone(), secret);

    let store = LocalObjectStore::new(&config.store_root, signer.clone())
        .with_context(|| format!("Failed to open object store at {}", config.store_root.display()))?
        .with_page_size(config.list_page_size);
    info!("Object store opened at {}", config.store_root.display());

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let fleet = FleetController::new(
        Arc::new(HttpFleet::new(FleetClient::with_client(
            config.fleet_url.clone(),
            http.clone(),
        ))),
        config.pool_name.clone(),
    );

    let mut context = Context::new(Arc::new(store), fleet, config.cluster_name.clone())
        .with_link_ttl(config.link_ttl);

    match &config.notify_url {
        Some(url) => {
            info!("Completion summaries will be posted to {}", url);
            context = context.with_notifier(Arc::new(WebhookNotifier::new(
                NotifyClient::with_client(url.clone(), http),
            )));
        }
        None => info!("No notification channel configured"),
    }

    Ok(AppState {
        context,
        signer,
        data_bucket: config.data_bucket.clone(),
        invocation_timeout: config.invocation_timeout,
    })
}

/// Processes one notification document and exits
async fn run_once(state: &AppState, path: &str) -> Result<()> {
    let document = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let batch = NotificationBatch::from_json(&document)
        .with_context(|| format!("{} is not a notification document", path))?;

    info!("Processing {} records from {}", batch.records.len(), path);

    let report = tokio::time::timeout(
        state.invocation_timeout,
        dispatch::dispatch_batch(&state.context, &batch),
    )
    .await
    .context("Invocation timed out")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} records failed",
            report.count(dispatch::Outcome::Failed),
            report.records.len()
        );
    }

    Ok(())
}

async fn serve(config: &Config, state: Arc<AppState>) -> Result<()> {
    let app = api::create_router(state);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
