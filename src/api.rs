use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    engine::DeliveryEngine,
    ingest::EventSender,
    models::{
        audit::DeliveryAudit,
        event::Event,
        health::HealthStatus,
        notification::{Notification, NotificationResult},
        response::ApiResponse,
    },
};

pub struct AppState {
    pub engine: Arc<DeliveryEngine>,
    pub events: EventSender,
}

pub async fn run_api_server(
    config: Config,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/notifications", post(send_notification))
        .route("/notifications/batch", post(send_batch))
        .route("/events", post(publish_event))
        .route("/audit/recent", get(recent_audits))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut health = state.engine.health();
    if state.events.is_closed() {
        health.status = HealthStatus::Unhealthy;
    }

    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<Notification>,
) -> impl IntoResponse {
    let result = state.engine.send(notification).await;

    // A rejected notification never reached any channel; everything else is
    // reported with its full per-channel result set.
    if result.results.is_empty() && result.error.is_some() {
        let error = result.error.clone().unwrap_or_default();
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<NotificationResult>::error(
                error,
                "notification rejected".to_string(),
            )),
        );
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            result,
            "notification processed".to_string(),
        )),
    )
}

async fn send_batch(
    State(state): State<Arc<AppState>>,
    Json(notifications): Json<Vec<Notification>>,
) -> impl IntoResponse {
    let results = state.engine.send_batch(notifications).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(results, "batch processed".to_string())),
    )
}

async fn publish_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Event>,
) -> impl IntoResponse {
    match state.events.publish(event).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::<()>::success((), "event accepted".to_string())),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(
                e.to_string(),
                "event queue unavailable".to_string(),
            )),
        ),
    }
}

#[derive(Deserialize)]
struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    limit: usize,
}

fn default_audit_limit() -> usize {
    50
}

async fn recent_audits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> impl IntoResponse {
    let audits: Vec<DeliveryAudit> = state.engine.recent_audits(query.limit.min(500));

    (
        StatusCode::OK,
        Json(ApiResponse::success(audits, "recent audits".to_string())),
    )
}
