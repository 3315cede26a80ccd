//! Instance endpoints

use crate::error::Result;
use crate::{FleetClient, handle_empty_response};

impl FleetClient {
    /// Terminate one instance
    ///
    /// `POST /instances/{id}/terminate`. Terminating an instance that is already
    /// gone is reported by the gateway as 404.
    pub async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        let url = self.endpoint(&["instances", instance_id, "terminate"])?;
        tracing::debug!("Terminating instance {}", instance_id);

        let response = self.client.post(url).send().await?;

        handle_empty_response(response).await
    }
}
