use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use delivery_engine::{
    channels::ChannelAdapter,
    config::Config,
    errors::DeliveryError,
    models::notification::{ChannelSpec, ChannelType, Notification},
};
use tokio::time::{Duration, sleep};

/// Configuration with fast timings so retry/backoff paths finish quickly.
pub fn test_config() -> Config {
    Config {
        retry_attempts: 3,
        retry_delay_ms: 10,
        max_retry_delay_ms: 50,
        circuit_failure_threshold: 5,
        circuit_cooldown_ms: 200,
        rate_limit_capacity: 1_000,
        rate_limit_window_ms: 1_000,
        delivery_timeout_ms: 2_000,
        ..Config::default()
    }
}

/// Scripted channel adapter: fails its first `fail_first` calls with a fixed
/// error, succeeds afterwards. Tracks call count and a concurrency high
/// watermark.
pub struct MockAdapter {
    channel: ChannelType,
    fail_first: u32,
    error: DeliveryError,
    delay: Duration,
    calls: AtomicU32,
    active: AtomicU32,
    max_active: AtomicU32,
}

impl MockAdapter {
    pub fn succeeding(channel: ChannelType) -> Self {
        Self::flaky(channel, 0, transient("unused"))
    }

    pub fn failing(channel: ChannelType, error: DeliveryError) -> Self {
        Self::flaky(channel, u32::MAX, error)
    }

    pub fn flaky(channel: ChannelType, fail_first: u32, error: DeliveryError) -> Self {
        Self {
            channel,
            fail_first,
            error,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            active: AtomicU32::new(0),
            max_active: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrency(&self) -> u32 {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelAdapter for MockAdapter {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    async fn deliver(
        &self,
        _notification: &Notification,
        _spec: &ChannelSpec,
    ) -> Result<(), DeliveryError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if call < self.fail_first {
            Err(self.error.clone())
        } else {
            Ok(())
        }
    }
}

pub fn transient(reason: &str) -> DeliveryError {
    DeliveryError::Transient {
        reason: reason.to_string(),
    }
}

pub fn permanent(reason: &str) -> DeliveryError {
    DeliveryError::Permanent {
        reason: reason.to_string(),
    }
}
