use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Email,
    Slack,
    Webhook,
    InApp,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Slack => "slack",
            ChannelType::Webhook => "webhook",
            ChannelType::InApp => "in_app",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    #[serde(rename = "type")]
    pub channel: ChannelType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl ChannelSpec {
    pub fn of(channel: ChannelType) -> Self {
        Self {
            channel,
            target: None,
            options: HashMap::new(),
        }
    }

    pub fn with_target(channel: ChannelType, target: impl Into<String>) -> Self {
        Self {
            channel,
            target: Some(target.into()),
            options: HashMap::new(),
        }
    }

    /// Key used to bucket rate-limit and circuit state. Channels that carry
    /// an explicit target (a webhook URL, a slack channel) are tracked
    /// per target; the rest share one bucket per channel type.
    pub fn target_id(&self) -> String {
        match &self.target {
            Some(target) => format!("{}:{}", self.channel, target),
            None => self.channel.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,
    pub message: String,

    #[serde(default)]
    pub channels: Vec<ChannelSpec>,

    #[serde(default)]
    pub recipient_roles: Vec<String>,

    #[serde(default)]
    pub recipient_ids: Vec<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

const MAX_TITLE_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 10_000;

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            message: message.into(),
            channels: Vec::new(),
            recipient_roles: Vec::new(),
            recipient_ids: Vec::new(),
            priority: Priority::Normal,
            module: None,
            event_type: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<ChannelSpec>) -> Self {
        self.channels = channels;
        self
    }

    pub fn validate(&self) -> Result<(), crate::errors::DeliveryError> {
        use crate::errors::DeliveryError;

        if self.title.trim().is_empty() {
            return Err(DeliveryError::Validation("title must not be empty".into()));
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err(DeliveryError::Validation(format!(
                "title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        if self.message.trim().is_empty() {
            return Err(DeliveryError::Validation(
                "message must not be empty".into(),
            ));
        }
        if self.message.len() > MAX_MESSAGE_LEN {
            return Err(DeliveryError::Validation(format!(
                "message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }

        for spec in &self.channels {
            if spec.channel == ChannelType::Webhook {
                match &spec.target {
                    Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                    Some(other) => {
                        return Err(DeliveryError::Validation(format!(
                            "webhook target '{other}' is not an http(s) URL"
                        )));
                    }
                    None => {
                        return Err(DeliveryError::Validation(
                            "webhook channel requires a target URL".into(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// An empty channel list resolves to a single implicit in-app delivery.
    pub fn resolved_channels(&self) -> Vec<ChannelSpec> {
        if self.channels.is_empty() {
            vec![ChannelSpec::of(ChannelType::InApp)]
        } else {
            self.channels.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel: ChannelType,
    pub status: ChannelStatus,
    pub timestamp: DateTime<Utc>,

    /// Number of delivery attempts actually made; 0 when the channel was
    /// rejected before the first attempt (rate limit, open circuit, skip).
    pub attempt: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelResult {
    pub fn sent(channel: ChannelType, attempt: u32) -> Self {
        Self {
            channel,
            status: ChannelStatus::Sent,
            timestamp: Utc::now(),
            attempt,
            error: None,
        }
    }

    pub fn failed(channel: ChannelType, attempt: u32, error: String) -> Self {
        Self {
            channel,
            status: ChannelStatus::Failed,
            timestamp: Utc::now(),
            attempt,
            error: Some(error),
        }
    }

    pub fn skipped(channel: ChannelType, error: String) -> Self {
        Self {
            channel,
            status: ChannelStatus::Skipped,
            timestamp: Utc::now(),
            attempt: 0,
            error: Some(error),
        }
    }
}

/// Composite outcome of one notification across all its channels.
///
/// `success` means at least one channel reached `sent` -- partial delivery
/// counts as success. Callers that need stricter semantics can inspect
/// `results` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub notification_id: String,
    pub success: bool,
    pub results: Vec<ChannelResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn rejected(notification_id: String, error: String) -> Self {
        Self {
            notification_id,
            success: false,
            results: Vec::new(),
            error: Some(error),
        }
    }
}
