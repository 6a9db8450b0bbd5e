use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::ChannelAdapter;
use crate::errors::DeliveryError;
use crate::models::notification::{ChannelSpec, ChannelType, Notification, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InAppMessage {
    pub notification_id: Option<String>,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub recipient_ids: Vec<String>,
    pub recipient_roles: Vec<String>,
    pub delivered_at: DateTime<Utc>,
}

const DEFAULT_INBOX_CAPACITY: usize = 1_000;

/// In-process inbox. The UI collaborator drains it; delivery here never
/// touches the network and always succeeds while the inbox has room.
pub struct InAppAdapter {
    inbox: Mutex<VecDeque<InAppMessage>>,
    capacity: usize,
}

impl InAppAdapter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inbox: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Most recent messages, newest first.
    pub fn recent(&self, limit: usize) -> Vec<InAppMessage> {
        let inbox = self.inbox.lock().unwrap();
        inbox.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inbox.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inbox.lock().unwrap().is_empty()
    }
}

impl Default for InAppAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelAdapter for InAppAdapter {
    fn channel_type(&self) -> ChannelType {
        ChannelType::InApp
    }

    async fn deliver(
        &self,
        notification: &Notification,
        _spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        let mut inbox = self.inbox.lock().unwrap();
        if inbox.len() >= self.capacity {
            inbox.pop_front();
        }

        inbox.push_back(InAppMessage {
            notification_id: notification.id.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            priority: notification.priority,
            recipient_ids: notification.recipient_ids.clone(),
            recipient_roles: notification.recipient_roles.clone(),
            delivered_at: Utc::now(),
        });

        Ok(())
    }
}
