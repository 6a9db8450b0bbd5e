use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::channels::ChannelAdapter;
use crate::errors::DeliveryError;
use crate::models::notification::{ChannelSpec, ChannelType, Notification};

/// Posts to a Slack incoming webhook. `spec.target` optionally overrides the
/// destination channel (e.g. `#ops`).
pub struct SlackAdapter {
    http_client: Client,
    webhook_url: String,
}

impl SlackAdapter {
    pub fn new(http_client: Client, webhook_url: String) -> Self {
        Self {
            http_client,
            webhook_url,
        }
    }
}

#[async_trait]
impl ChannelAdapter for SlackAdapter {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Slack
    }

    async fn deliver(
        &self,
        notification: &Notification,
        spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        debug!(notification_id = ?notification.id, "posting slack message");

        let mut payload = json!({
            "text": format!("*{}*\n{}", notification.title, notification.message),
        });
        if let Some(channel) = &spec.target {
            payload["channel"] = json!(channel);
        }

        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(DeliveryError::from_status(status.as_u16(), detail))
        }
    }
}
