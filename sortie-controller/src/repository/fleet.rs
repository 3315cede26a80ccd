//! Fleet repository
//!
//! Talks to whatever owns the compute pool. The controller only ever asks for
//! a desired capacity or for one instance to go away; it never waits for the
//! pool to converge.

use async_trait::async_trait;
use sortie_client::{ClientError, FleetClient};
use thiserror::Error;

pub use sortie_client::PoolDescription;

/// Fleet backend errors
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("fleet request failed: {0}")]
    Client(#[from] ClientError),
}

/// Repository trait for compute pool control
#[async_trait]
pub trait Fleet: Send + Sync {
    /// Reads the pool's current and configured sizes
    async fn describe_pool(&self, pool: &str) -> Result<PoolDescription, FleetError>;

    /// Sets the desired capacity of the pool
    async fn set_desired_capacity(&self, pool: &str, capacity: u32) -> Result<(), FleetError>;

    /// Terminates exactly one instance
    async fn terminate_instance(&self, instance_id: &str) -> Result<(), FleetError>;
}

/// HTTP implementation of Fleet, backed by the fleet gateway
pub struct HttpFleet {
    client: FleetClient,
}

impl HttpFleet {
    pub fn new(client: FleetClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fleet for HttpFleet {
    async fn describe_pool(&self, pool: &str) -> Result<PoolDescription, FleetError> {
        self.client.describe_pool(pool).await.map_err(|e| {
            if e.is_not_found() {
                FleetError::PoolNotFound(pool.to_string())
            } else {
                e.into()
            }
        })
    }

    async fn set_desired_capacity(&self, pool: &str, capacity: u32) -> Result<(), FleetError> {
        self.client
            .set_desired_capacity(pool, capacity)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    FleetError::PoolNotFound(pool.to_string())
                } else {
                    e.into()
                }
            })
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<(), FleetError> {
        match self.client.terminate_instance(instance_id).await {
            Ok(()) => Ok(()),
            // Already gone, typically because the node terminated itself
            Err(e) if e.is_not_found() => {
                tracing::debug!("Instance {} no longer exists", instance_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
