use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::channels::ChannelAdapter;
use crate::errors::DeliveryError;
use crate::models::notification::{ChannelSpec, ChannelType, Notification};

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: Vec<&'a str>,
    roles: &'a [String],
    subject: &'a str,
    body: &'a str,
}

/// Delivers through an HTTP mail relay. Recipient resolution (role to
/// address expansion) happens relay-side; the adapter forwards both the
/// explicit target and the recipient roles.
pub struct EmailAdapter {
    http_client: Client,
    relay_url: String,
    api_key: String,
}

impl EmailAdapter {
    pub fn new(http_client: Client, relay_url: String, api_key: String) -> Self {
        Self {
            http_client,
            relay_url,
            api_key,
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn deliver(
        &self,
        notification: &Notification,
        spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        let mut to: Vec<&str> = notification.recipient_ids.iter().map(|s| s.as_str()).collect();
        if let Some(target) = &spec.target {
            to.push(target.as_str());
        }

        debug!(
            notification_id = ?notification.id,
            recipients = to.len(),
            "sending email via relay"
        );

        let message = RelayMessage {
            to,
            roles: &notification.recipient_roles,
            subject: &notification.title,
            body: &notification.message,
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.relay_url))
            .bearer_auth(&self.api_key)
            .json(&message)
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
