//! Fleet Controller
//!
//! Drives the desired capacity of the job's compute pool. Every operation is a
//! single request; convergence is left to whatever supervises the pool.

use std::sync::Arc;

use crate::repository::{Fleet, FleetError};

pub struct FleetController {
    fleet: Arc<dyn Fleet>,
    pool: String,
}

impl FleetController {
    pub fn new(fleet: Arc<dyn Fleet>, pool: impl Into<String>) -> Self {
        Self {
            fleet,
            pool: pool.into(),
        }
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Sets desired capacity to exactly `n`
    pub async fn scale_to(&self, n: u32) -> Result<(), FleetError> {
        tracing::info!("Scaling pool {} to {}", self.pool, n);
        self.fleet.set_desired_capacity(&self.pool, n).await
    }

    /// Sets desired capacity to the pool's configured maximum
    ///
    /// Returns the capacity requested.
    pub async fn scale_to_max(&self) -> Result<u32, FleetError> {
        let description = self.fleet.describe_pool(&self.pool).await?;
        self.scale_to(description.max_size).await?;
        Ok(description.max_size)
    }

    /// Number of instances currently in the pool
    pub async fn current_size(&self) -> Result<u32, FleetError> {
        let description = self.fleet.describe_pool(&self.pool).await?;
        Ok(description.current_size)
    }

    /// Terminates one instance
    pub async fn terminate(&self, instance_id: &str) -> Result<(), FleetError> {
        tracing::info!("Terminating instance {}", instance_id);
        self.fleet.terminate_instance(instance_id).await
    }
}
