//! Pool capacity endpoints

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{FleetClient, handle_empty_response, handle_response};

/// Sizing of a compute pool as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescription {
    pub name: String,
    pub desired_capacity: u32,
    pub min_size: u32,
    pub max_size: u32,
    /// Instances currently in service
    pub current_size: u32,
}

#[derive(Debug, Serialize)]
struct DesiredCapacityRequest {
    desired_capacity: u32,
}

impl FleetClient {
    // =============================================================================
    // Pool Capacity
    // =============================================================================

    /// Describe a pool
    ///
    /// `GET /pools/{name}`
    pub async fn describe_pool(&self, name: &str) -> Result<PoolDescription> {
        let url = self.endpoint(&["pools", name])?;
        let response = self.client.get(url).send().await?;

        handle_response(response).await
    }

    /// Set the desired capacity of a pool
    ///
    /// `PUT /pools/{name}/desired-capacity`. Returns as soon as the gateway
    /// accepts the request.
    pub async fn set_desired_capacity(&self, name: &str, desired_capacity: u32) -> Result<()> {
        let url = self.endpoint(&["pools", name, "desired-capacity"])?;
        tracing::debug!("Setting desired capacity of {} to {}", name, desired_capacity);

        let response = self
            .client
            .put(url)
            .json(&DesiredCapacityRequest { desired_capacity })
            .send()
            .await?;

        handle_empty_response(response).await
    }
}
