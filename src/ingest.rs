use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::DeliveryEngine;
use crate::errors::DeliveryError;
use crate::models::event::Event;
use crate::models::notification::{ChannelSpec, ChannelType, Notification, Priority};

/// Producer handle for the event queue. The queue is bounded; `publish`
/// awaits when it is full, which is the backpressure contract producers
/// sign up for.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    pub async fn publish(&self, event: Event) -> Result<(), DeliveryError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DeliveryError::Permanent {
                reason: "event queue is closed".into(),
            })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Maps an event to the notification the engine should deliver. Rules are
/// keyed on source system and event type, with an in-app default for
/// anything unrecognized.
pub fn normalize(event: &Event) -> Notification {
    let title = event
        .payload
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}: {}", event.source_system, event.event_type));

    let message = event
        .payload
        .get("message")
        .or_else(|| event.payload.get("summary"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("event {} from {}", event.event_type, event.source_system));

    let mut notification = Notification::new(title, message);
    notification.id = Some(event.id.clone());
    notification.module = Some(event.source_system.clone());
    notification.event_type = Some(event.event_type.clone());

    match (event.source_system.as_str(), event.event_type.as_str()) {
        ("monitoring", kind) if kind.starts_with("alert.") => {
            notification.priority = Priority::High;
            notification.channels = vec![
                ChannelSpec::of(ChannelType::Slack),
                ChannelSpec::of(ChannelType::InApp),
            ];
        }
        ("scim", "sync.failed") => {
            notification.priority = Priority::High;
            notification.recipient_roles = vec!["admin".to_string()];
            notification.channels = vec![
                ChannelSpec::of(ChannelType::Email),
                ChannelSpec::of(ChannelType::InApp),
            ];
        }
        ("tickets", "ticket.assigned") => {
            notification.channels = vec![
                ChannelSpec::of(ChannelType::InApp),
                ChannelSpec::of(ChannelType::Email),
            ];
        }
        ("chatops", _) => {
            notification.channels = vec![ChannelSpec::of(ChannelType::Slack)];
        }
        // Everything else falls through to the implicit in-app channel.
        _ => {}
    }

    notification
}

/// Drains the event queue, normalizing each event and handing it to the
/// engine. Runs until every sender is dropped.
pub async fn run_ingest(mut receiver: EventReceiver, engine: Arc<DeliveryEngine>) {
    info!("event ingest loop started");

    while let Some(event) = receiver.rx.recv().await {
        debug!(
            event_id = %event.id,
            source = %event.source_system,
            event_type = %event.event_type,
            "event received"
        );

        let notification = normalize(&event);
        let result = engine.send(notification).await;

        if !result.success {
            warn!(
                event_id = %event.id,
                notification_id = %result.notification_id,
                "event notification was not delivered on any channel"
            );
        }
    }

    info!("event ingest loop stopped");
}
