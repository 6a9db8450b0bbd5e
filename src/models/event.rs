use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event received from a producer (ticket lifecycle, SCIM sync,
/// monitoring, chat-ops) or an external system. Consumed exactly once by the
/// ingest normalizer; never persisted by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "new_event_id")]
    pub id: String,

    pub source_system: String,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub payload: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

impl Event {
    pub fn new(source_system: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: new_event_id(),
            source_system: source_system.into(),
            event_type: event_type.into(),
            payload: serde_json::Value::Null,
            correlation_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
