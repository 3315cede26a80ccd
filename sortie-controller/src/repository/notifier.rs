//! Completion notifier
//!
//! Delivers the human-readable job summary. The channel is optional; when it
//! is not configured the controller simply has no notifier.

use async_trait::async_trait;
use sortie_client::{ClientError, NotifyClient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(#[from] ClientError),
}

/// Repository trait for the notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Posts summaries to a webhook
pub struct WebhookNotifier {
    client: NotifyClient,
}

impl WebhookNotifier {
    pub fn new(client: NotifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.client.publish(subject, body).await?;
        tracing::debug!("Notification '{}' delivered to {}", subject, self.client.url());
        Ok(())
    }
}
