use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use reqwest::Client;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};
use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::channels::{ChannelAdapter, build_adapters};
use crate::clients::{IntegrationRegistry, IntegrationRequest, IntegrationResponse};
use crate::config::Config;
use crate::errors::DeliveryError;
use crate::limiter::RateLimiter;
use crate::models::audit::DeliveryAudit;
use crate::models::circuit_breaker::CircuitState;
use crate::models::health::{HealthCheckResponse, HealthStatus, TargetHealth};
use crate::models::notification::{
    ChannelResult, ChannelSpec, ChannelStatus, ChannelType, Notification, NotificationResult,
};
use crate::models::retry::RetryPolicy;
use crate::retry;
use crate::tracker::{AuditSink, DeliveryTracker, TracingAuditSink};

/// Top-level delivery engine. Constructed once at process start and handed
/// to callers explicitly; tests build isolated instances with mock adapters
/// through the builder.
pub struct DeliveryEngine {
    adapters: HashMap<ChannelType, Arc<dyn ChannelAdapter>>,
    registry: Arc<IntegrationRegistry>,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    delivery_timeout: Duration,
    batch_size: usize,
    tracker: DeliveryTracker,
}

pub struct EngineBuilder {
    config: Config,
    adapters: Option<HashMap<ChannelType, Arc<dyn ChannelAdapter>>>,
    registry: Option<Arc<IntegrationRegistry>>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl EngineBuilder {
    pub fn adapters(mut self, adapters: HashMap<ChannelType, Arc<dyn ChannelAdapter>>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Registers a single adapter under its own channel type, on top of
    /// whatever adapters are already configured.
    pub fn adapter(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        let mut adapters = self.adapters.take().unwrap_or_default();
        adapters.insert(adapter.channel_type(), adapter);
        self.adapters = Some(adapters);
        self
    }

    pub fn registry(mut self, registry: Arc<IntegrationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> DeliveryEngine {
        let http_client = Client::new();

        let adapters = self
            .adapters
            .unwrap_or_else(|| build_adapters(&self.config, &http_client));
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(IntegrationRegistry::new(self.config.clone(), http_client)));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingAuditSink));

        DeliveryEngine {
            adapters,
            registry,
            breaker: Arc::new(CircuitBreaker::new(self.config.circuit_breaker_config())),
            limiter: Arc::new(RateLimiter::new(self.config.rate_limit_config())),
            retry_policy: self.config.retry_policy(),
            delivery_timeout: Duration::from_millis(self.config.delivery_timeout_ms),
            batch_size: self.config.batch_size.max(1),
            tracker: DeliveryTracker::new(sink),
        }
    }
}

impl DeliveryEngine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder {
            config,
            adapters: None,
            registry: None,
            sink: None,
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self::builder(config).build()
    }

    /// Delivers one notification across all its resolved channels.
    ///
    /// Channels run concurrently and fail independently; the composite
    /// `success` is true when at least one channel was sent. A notification
    /// that fails validation is rejected before any channel is attempted.
    pub async fn send(&self, mut notification: Notification) -> NotificationResult {
        let notification_id = notification
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        notification.id = Some(notification_id.clone());

        if let Err(e) = notification.validate() {
            warn!(notification_id = %notification_id, error = %e, "notification rejected");
            let result = NotificationResult::rejected(notification_id, e.to_string());
            self.tracker.record(&notification, &result).await;
            return result;
        }

        let channels = notification.resolved_channels();
        let results = join_all(
            channels
                .iter()
                .map(|spec| self.deliver_channel(&notification, spec)),
        )
        .await;

        let success = results.iter().any(|r| r.status == ChannelStatus::Sent);
        let result = NotificationResult {
            notification_id: notification_id.clone(),
            success,
            results,
            error: None,
        };

        info!(
            notification_id = %notification_id,
            success,
            channels = result.results.len(),
            "notification delivery settled"
        );

        self.tracker.record(&notification, &result).await;
        result
    }

    /// Delivers a list of notifications in order-preserving batches.
    ///
    /// Items within a batch run concurrently with per-item isolation; a new
    /// batch does not start until the previous one has fully settled, which
    /// bounds peak concurrency to one batch.
    pub async fn send_batch(&self, notifications: Vec<Notification>) -> Vec<NotificationResult> {
        let total = notifications.len();
        let mut results = Vec::with_capacity(total);
        let mut pending = notifications.into_iter();

        loop {
            let batch: Vec<Notification> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let settled = join_all(batch.into_iter().map(|n| self.send(n))).await;
            results.extend(settled);
        }

        info!(total, batch_size = self.batch_size, "batch delivery settled");
        results
    }

    async fn deliver_channel(
        &self,
        notification: &Notification,
        spec: &ChannelSpec,
    ) -> ChannelResult {
        let channel = spec.channel;
        let Some(adapter) = self.adapters.get(&channel) else {
            return ChannelResult::skipped(
                channel,
                format!("no adapter registered for channel '{channel}'"),
            );
        };

        let target = spec.target_id();
        if !self.limiter.try_acquire(&target, 1) {
            let e = DeliveryError::RateLimitExceeded {
                target: target.clone(),
            };
            return ChannelResult::failed(channel, 0, format!("{}: {}", e.kind(), e));
        }

        let delivery_timeout = self.delivery_timeout;
        let attempted = retry::execute(&self.retry_policy, &self.breaker, &target, || {
            let adapter = Arc::clone(adapter);
            async move {
                match timeout(delivery_timeout, adapter.deliver(notification, spec)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DeliveryError::Transient {
                        reason: format!(
                            "delivery timed out after {}ms",
                            delivery_timeout.as_millis()
                        ),
                    }),
                }
            }
        })
        .await;

        match attempted.outcome {
            Ok(()) => ChannelResult::sent(channel, attempted.attempts),
            Err(e @ DeliveryError::ConfigurationMissing { .. }) => {
                ChannelResult::skipped(channel, format!("{}: {}", e.kind(), e))
            }
            Err(e) => {
                ChannelResult::failed(channel, attempted.attempts, format!("{}: {}", e.kind(), e))
            }
        }
    }

    /// Calls a named downstream integration through the same rate-limit,
    /// circuit-breaker and retry guards as channel deliveries.
    pub async fn call_integration(
        &self,
        target: &str,
        request: IntegrationRequest,
    ) -> Result<IntegrationResponse, DeliveryError> {
        let key = format!("integration:{target}");
        if !self.limiter.try_acquire(&key, 1) {
            return Err(DeliveryError::RateLimitExceeded { target: key });
        }

        let client = self.registry.resolve(target);
        let delivery_timeout = self.delivery_timeout;

        let attempted = retry::execute(&self.retry_policy, &self.breaker, &key, || {
            let client = Arc::clone(&client);
            let request = request.clone();
            async move {
                match timeout(delivery_timeout, client.execute(&request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DeliveryError::Transient {
                        reason: format!(
                            "integration call timed out after {}ms",
                            delivery_timeout.as_millis()
                        ),
                    }),
                }
            }
        })
        .await;

        attempted.outcome
    }

    pub fn recent_audits(&self, limit: usize) -> Vec<DeliveryAudit> {
        self.tracker.recent(limit)
    }

    /// Aggregated health of every target the engine has seen: circuit states
    /// plus integration enablement.
    pub fn health(&self) -> HealthCheckResponse {
        let mut targets = HashMap::new();

        for (name, state) in self.breaker.snapshot() {
            targets.insert(
                name,
                TargetHealth::circuit(state.to_string(), state != CircuitState::Open),
            );
        }

        for (name, enabled) in self.registry.status() {
            let key = format!("integration:{name}");
            if enabled {
                targets.entry(key).or_insert_with(TargetHealth::healthy);
            } else {
                targets.insert(key, TargetHealth::disabled("configuration missing".into()));
            }
        }

        let status = if targets
            .values()
            .any(|t| t.status != HealthStatus::Healthy)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResponse {
            status,
            timestamp: Utc::now(),
            targets,
        }
    }
}
