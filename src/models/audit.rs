use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::notification::{ChannelResult, ChannelStatus, Notification, NotificationResult};

/// Terminal record of one notification delivery, handed to the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAudit {
    pub id: Uuid,
    pub notification_id: String,
    pub title: String,
    pub module: Option<String>,
    pub event_type: Option<String>,
    pub success: bool,
    pub channels_attempted: usize,
    pub channels_sent: usize,
    pub results: Vec<ChannelResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryAudit {
    pub fn from_result(notification: &Notification, result: &NotificationResult) -> Self {
        let channels_sent = result
            .results
            .iter()
            .filter(|r| r.status == ChannelStatus::Sent)
            .count();

        Self {
            id: Uuid::new_v4(),
            notification_id: result.notification_id.clone(),
            title: notification.title.clone(),
            module: notification.module.clone(),
            event_type: notification.event_type.clone(),
            success: result.success,
            channels_attempted: result.results.len(),
            channels_sent,
            results: result.results.clone(),
            error: result.error.clone(),
            created_at: Utc::now(),
        }
    }
}
