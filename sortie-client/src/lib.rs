//! Sortie HTTP Clients
//!
//! Typed HTTP clients for the services the controller drives but does not own:
//!
//! - [`FleetClient`]: the fleet gateway that owns the compute pool. It sets
//!   desired capacity, describes pools and terminates single instances.
//! - [`NotifyClient`]: an optional webhook that receives job completion summaries.
//!
//! # Example
//!
//! ```no_run
//! use sortie_client::FleetClient;
//!
//! #[tokio::main]
//! async fn main() -> sortie_client::Result<()> {
//!     let fleet = FleetClient::new("http://fleet-gateway:9000");
//!
//!     let pool = fleet.describe_pool("sortie-workers").await?;
//!     fleet.set_desired_capacity("sortie-workers", pool.max_size).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
mod instances;
mod notify;
mod pools;

pub use error::{ClientError, Result};
pub use notify::{CompletionMessage, NotifyClient};
pub use pools::PoolDescription;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the fleet gateway
///
/// Every call is a single request; the client never waits for the fleet to
/// converge on a requested size.
#[derive(Debug, Clone)]
pub struct FleetClient {
    /// Base URL of the gateway (e.g., "http://fleet-gateway:9000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl FleetClient {
    /// Create a new fleet client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new fleet client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("bad base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Checks the status code and deserializes a JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Checks the status code of a response whose body is irrelevant
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
