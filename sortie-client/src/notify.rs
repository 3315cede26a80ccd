//! Completion notification webhook

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handle_empty_response;

/// Body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub subject: String,
    pub message: String,
}

/// HTTP client for the notification webhook
#[derive(Debug, Clone)]
pub struct NotifyClient {
    url: String,
    client: Client,
}

impl NotifyClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts one message
    pub async fn publish(&self, subject: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&CompletionMessage {
                subject: subject.to_string(),
                message: message.to_string(),
            })
            .send()
            .await?;

        handle_empty_response(response).await
    }
}
