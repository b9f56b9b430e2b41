//! Push delivery backends.
//!
//! Delivery is behind a trait so the matcher can be tested without a
//! network and deployments without a push gateway still run.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DeliveryError;

/// One rendered push notification.
#[derive(Debug, Clone)]
pub struct PushMessage {
    /// Destination device token.
    pub token: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub posting_id: String,
}

/// A push delivery backend.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError>;
}

/// Sends pushes as JSON POSTs to a configured webhook endpoint.
pub struct WebhookPushSender {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookPushSender {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError(format!("push client: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PushSender for WebhookPushSender {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        let body = serde_json::json!({
            "to": message.token,
            "title": format!("New job at {}", message.company),
            "body": match &message.location {
                Some(location) => format!("{} ({location})", message.title),
                None => message.title.clone(),
            },
            "posting_id": message.posting_id,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError(format!("HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

/// Logs deliveries instead of sending them. Used when no push endpoint
/// is configured.
pub struct NullPushSender;

#[async_trait]
impl PushSender for NullPushSender {
    async fn send(&self, message: &PushMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            posting_id = %message.posting_id,
            title = %message.title,
            company = %message.company,
            "push delivery skipped (no endpoint configured)"
        );
        Ok(())
    }
}
