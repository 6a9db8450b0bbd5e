use std::sync::Arc;

use anyhow::Result;
use delivery_engine::{
    channels::InAppAdapter,
    clients::IntegrationRequest,
    engine::DeliveryEngine,
    errors::DeliveryError,
    ingest::{event_channel, run_ingest},
    models::{
        event::Event,
        notification::{ChannelSpec, ChannelStatus, ChannelType, Notification},
    },
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

use crate::common::test_config;

/// Test: A notification addressed to a live webhook is delivered once
#[tokio::test]
async fn test_webhook_delivery_success() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/incidents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = DeliveryEngine::from_config(test_config());

    let notification = Notification::new("Incident", "api down").with_channels(vec![
        ChannelSpec::with_target(ChannelType::Webhook, format!("{}/hooks/incidents", server.uri())),
    ]);

    let result = engine.send(notification).await;

    assert!(result.success);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].channel, ChannelType::Webhook);
    assert_eq!(result.results[0].status, ChannelStatus::Sent);
    assert_eq!(result.results[0].attempt, 1);

    Ok(())
}

/// Test: A 503-returning webhook is retried exactly retry_attempts times
#[tokio::test]
async fn test_webhook_503_retried_to_exhaustion() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.retry_attempts = 3;
    let engine = DeliveryEngine::from_config(config);

    let notification = Notification::new("Incident", "api down").with_channels(vec![
        ChannelSpec::with_target(ChannelType::Webhook, format!("{}/hooks/flaky", server.uri())),
    ]);

    let result = engine.send(notification).await;

    assert!(!result.success);
    assert_eq!(result.results[0].status, ChannelStatus::Failed);
    assert_eq!(result.results[0].attempt, 3);

    server.verify().await;
    Ok(())
}

/// Test: A webhook that recovers mid-retry ends as sent
#[tokio::test]
async fn test_webhook_recovers_after_transient_failure() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/recovering"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/recovering"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let engine = DeliveryEngine::from_config(test_config());

    let notification = Notification::new("Incident", "recovered").with_channels(vec![
        ChannelSpec::with_target(
            ChannelType::Webhook,
            format!("{}/hooks/recovering", server.uri()),
        ),
    ]);

    let result = engine.send(notification).await;

    assert!(result.success);
    assert_eq!(result.results[0].attempt, 2);

    Ok(())
}

/// Test: A 400-returning webhook is permanent and never retried
#[tokio::test]
async fn test_webhook_400_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/bad"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let engine = DeliveryEngine::from_config(test_config());

    let notification = Notification::new("Incident", "bad payload").with_channels(vec![
        ChannelSpec::with_target(ChannelType::Webhook, format!("{}/hooks/bad", server.uri())),
    ]);

    let result = engine.send(notification).await;

    assert!(!result.success);
    assert_eq!(result.results[0].attempt, 1);

    server.verify().await;
    Ok(())
}

/// Test: Email delivery goes through the configured relay
#[tokio::test]
async fn test_email_delivery_via_relay() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("authorization", "Bearer relay-key"))
        .and(body_partial_json(json!({ "subject": "Test" })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.smtp_relay_url = Some(server.uri());
    config.smtp_api_key = Some("relay-key".to_string());

    let engine = DeliveryEngine::from_config(config);

    let notification = Notification::new("Test", "hi")
        .with_channels(vec![ChannelSpec::of(ChannelType::Email)]);

    let result = engine.send(notification).await;

    assert!(result.success);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].channel, ChannelType::Email);
    assert_eq!(result.results[0].status, ChannelStatus::Sent);

    Ok(())
}

/// Test: Slack delivery posts to the incoming webhook with channel override
#[tokio::test]
async fn test_slack_delivery_with_channel_override() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T000/B000"))
        .and(body_partial_json(json!({ "channel": "#ops" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.slack_webhook_url = Some(format!("{}/services/T000/B000", server.uri()));

    let engine = DeliveryEngine::from_config(config);

    let notification = Notification::new("Alert", "disk almost full")
        .with_channels(vec![ChannelSpec::with_target(ChannelType::Slack, "#ops")]);

    let result = engine.send(notification).await;

    assert!(result.success);
    assert_eq!(result.results[0].status, ChannelStatus::Sent);

    Ok(())
}

/// Test: Integration calls flow through the registry with auth and retries
#[tokio::test]
async fn test_integration_call_success() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/now/table/incident"))
        .and(header("authorization", "Bearer sn-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.servicenow_base_url = Some(server.uri());
    config.servicenow_token = Some("sn-token".to_string());

    let engine = DeliveryEngine::from_config(config);

    let response = engine
        .call_integration("servicenow", IntegrationRequest::get("/api/now/table/incident"))
        .await?;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "result": [] }));

    Ok(())
}

/// Test: Integration 404 is permanent and not retried
#[tokio::test]
async fn test_integration_permanent_failure_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.goalert_base_url = Some(server.uri());
    config.goalert_token = Some("token".to_string());

    let engine = DeliveryEngine::from_config(config);

    let outcome = engine
        .call_integration("goalert", IntegrationRequest::get("/missing"))
        .await;

    assert!(matches!(outcome, Err(DeliveryError::Permanent { .. })));
    server.verify().await;
    Ok(())
}

/// Test: An unconfigured integration fails fast with ConfigurationMissing
#[tokio::test]
async fn test_integration_disabled_without_configuration() -> Result<()> {
    let engine = DeliveryEngine::from_config(test_config());

    let outcome = engine
        .call_integration("helpscout", IntegrationRequest::get("/v2/conversations"))
        .await;

    assert!(matches!(
        outcome,
        Err(DeliveryError::ConfigurationMissing { .. })
    ));

    Ok(())
}

/// Test: Events published to the ingest queue end up delivered in-app
#[tokio::test]
async fn test_event_ingest_to_in_app_delivery() -> Result<()> {
    let in_app = Arc::new(InAppAdapter::new());
    let engine = Arc::new(
        DeliveryEngine::builder(test_config())
            .adapter(in_app.clone())
            .build(),
    );

    let (events, receiver) = event_channel(8);
    let ingest = tokio::spawn(run_ingest(receiver, Arc::clone(&engine)));

    let event = Event::new("tickets", "ticket.created").with_payload(json!({
        "title": "Ticket #1001 created",
        "message": "Printer on floor 3 is jammed",
    }));
    events.publish(event).await?;

    // Closing the queue lets the ingest loop drain and stop.
    drop(events);
    ingest.await?;

    assert_eq!(in_app.len(), 1);
    let delivered = &in_app.recent(1)[0];
    assert_eq!(delivered.title, "Ticket #1001 created");

    let audits = engine.recent_audits(1);
    assert_eq!(audits.len(), 1);
    assert!(audits[0].success);
    assert_eq!(audits[0].module.as_deref(), Some("tickets"));

    Ok(())
}
