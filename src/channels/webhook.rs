use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::channels::ChannelAdapter;
use crate::errors::DeliveryError;
use crate::models::notification::{ChannelSpec, ChannelType, Notification};

/// Posts the notification as JSON to the URL named in `spec.target`.
pub struct WebhookAdapter {
    http_client: Client,
}

impl WebhookAdapter {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Webhook
    }

    async fn deliver(
        &self,
        notification: &Notification,
        spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        // Validation runs before dispatch, but a spec can still arrive here
        // directly in library use.
        let url = spec.target.as_deref().ok_or_else(|| {
            DeliveryError::Permanent {
                reason: "webhook channel has no target URL".into(),
            }
        })?;

        debug!(notification_id = ?notification.id, url, "posting webhook");

        let payload = json!({
            "id": notification.id,
            "title": notification.title,
            "message": notification.message,
            "priority": notification.priority,
            "module": notification.module,
            "event_type": notification.event_type,
            "created_at": notification.created_at,
        });

        let response = self.http_client.post(url).json(&payload).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(DeliveryError::from_status(status.as_u16(), detail))
        }
    }
}
