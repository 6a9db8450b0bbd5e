use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::DeliveryError;
use crate::models::audit::DeliveryAudit;
use crate::models::notification::{Notification, NotificationResult};

/// Durable audit persistence is an external collaborator behind this trait.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, entry: &DeliveryAudit) -> Result<(), DeliveryError>;
}

/// Default sink: structured log records only.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn persist(&self, entry: &DeliveryAudit) -> Result<(), DeliveryError> {
        info!(
            notification_id = %entry.notification_id,
            success = entry.success,
            channels_attempted = entry.channels_attempted,
            channels_sent = entry.channels_sent,
            "delivery audit"
        );
        Ok(())
    }
}

const DEFAULT_RETAIN: usize = 500;

/// Shapes terminal delivery results into audit records, hands them to the
/// sink, and keeps a bounded in-memory window for operational queries.
pub struct DeliveryTracker {
    sink: Arc<dyn AuditSink>,
    recent: Mutex<VecDeque<DeliveryAudit>>,
    retain: usize,
}

impl DeliveryTracker {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            recent: Mutex::new(VecDeque::new()),
            retain: DEFAULT_RETAIN,
        }
    }

    pub async fn record(&self, notification: &Notification, result: &NotificationResult) {
        let entry = DeliveryAudit::from_result(notification, result);

        // A sink failure must never fail the delivery itself.
        if let Err(e) = self.sink.persist(&entry).await {
            warn!(
                notification_id = %entry.notification_id,
                error = %e,
                "failed to persist audit record"
            );
        }

        let mut recent = self.recent.lock().unwrap();
        if recent.len() >= self.retain {
            recent.pop_front();
        }
        recent.push_back(entry);
    }

    /// Most recent audit records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<DeliveryAudit> {
        let recent = self.recent.lock().unwrap();
        recent.iter().rev().take(limit).cloned().collect()
    }
}
