use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::Config;
use crate::errors::DeliveryError;
use crate::models::notification::{ChannelSpec, ChannelType, Notification};

pub mod email;
pub mod in_app;
pub mod slack;
pub mod webhook;

pub use email::EmailAdapter;
pub use in_app::InAppAdapter;
pub use slack::SlackAdapter;
pub use webhook::WebhookAdapter;

/// One delivery channel. Adapters are stateless request/response wrappers
/// around a transport; retries, rate limiting and circuit breaking happen
/// above them in the engine.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn channel_type(&self) -> ChannelType;

    async fn deliver(
        &self,
        notification: &Notification,
        spec: &ChannelSpec,
    ) -> Result<(), DeliveryError>;
}

/// Stand-in for a channel whose configuration is absent. Every delivery
/// fails fast with `ConfigurationMissing`, which the engine reports as a
/// skipped channel.
pub struct DisabledAdapter {
    channel: ChannelType,
}

impl DisabledAdapter {
    pub fn new(channel: ChannelType) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelAdapter for DisabledAdapter {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    async fn deliver(
        &self,
        _notification: &Notification,
        _spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        Err(DeliveryError::ConfigurationMissing {
            target: self.channel.to_string(),
        })
    }
}

/// Builds the adapter set from configuration. Channels with missing
/// credentials degrade to `DisabledAdapter` with a one-time warning instead
/// of failing startup.
pub fn build_adapters(
    config: &Config,
    http: &reqwest::Client,
) -> HashMap<ChannelType, Arc<dyn ChannelAdapter>> {
    let mut adapters: HashMap<ChannelType, Arc<dyn ChannelAdapter>> = HashMap::new();

    match (&config.smtp_relay_url, &config.smtp_api_key) {
        (Some(url), Some(key)) => {
            adapters.insert(
                ChannelType::Email,
                Arc::new(EmailAdapter::new(http.clone(), url.clone(), key.clone())),
            );
        }
        _ => {
            warn!("email channel disabled: SMTP_RELAY_URL or SMTP_API_KEY not set");
            adapters.insert(
                ChannelType::Email,
                Arc::new(DisabledAdapter::new(ChannelType::Email)),
            );
        }
    }

    match &config.slack_webhook_url {
        Some(url) => {
            adapters.insert(
                ChannelType::Slack,
                Arc::new(SlackAdapter::new(http.clone(), url.clone())),
            );
        }
        None => {
            warn!("slack channel disabled: SLACK_WEBHOOK_URL not set");
            adapters.insert(
                ChannelType::Slack,
                Arc::new(DisabledAdapter::new(ChannelType::Slack)),
            );
        }
    }

    adapters.insert(
        ChannelType::Webhook,
        Arc::new(WebhookAdapter::new(http.clone())),
    );
    adapters.insert(ChannelType::InApp, Arc::new(InAppAdapter::new()));

    adapters
}
