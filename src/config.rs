use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::{
    circuit_breaker::CircuitBreakerConfig, rate_limit::RateLimitConfig, retry::RetryPolicy,
};

/// Engine configuration, deserialized from the environment. Every knob has
/// a default and every credential is optional, so the process always starts;
/// unconfigured channels and integrations run disabled.
#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_circuit_failure_threshold")]
    pub circuit_failure_threshold: u32,

    #[serde(default = "default_circuit_cooldown_ms")]
    pub circuit_cooldown_ms: u64,

    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,

    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default)]
    pub smtp_relay_url: Option<String>,
    #[serde(default)]
    pub smtp_api_key: Option<String>,

    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    #[serde(default)]
    pub servicenow_base_url: Option<String>,
    #[serde(default)]
    pub servicenow_token: Option<String>,

    #[serde(default)]
    pub helpscout_base_url: Option<String>,
    #[serde(default)]
    pub helpscout_api_key: Option<String>,

    #[serde(default)]
    pub goalert_base_url: Option<String>,
    #[serde(default)]
    pub goalert_token: Option<String>,
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1_000
}
fn default_max_retry_delay_ms() -> u64 {
    30_000
}
fn default_batch_size() -> usize {
    100
}
fn default_circuit_failure_threshold() -> u32 {
    5
}
fn default_circuit_cooldown_ms() -> u64 {
    30_000
}
fn default_rate_limit_capacity() -> u32 {
    60
}
fn default_rate_limit_window_ms() -> u64 {
    60_000
}
fn default_delivery_timeout_ms() -> u64 {
    10_000
}
fn default_event_queue_capacity() -> usize {
    256
}
fn default_server_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            batch_size: default_batch_size(),
            circuit_failure_threshold: default_circuit_failure_threshold(),
            circuit_cooldown_ms: default_circuit_cooldown_ms(),
            rate_limit_capacity: default_rate_limit_capacity(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            server_port: default_server_port(),
            smtp_relay_url: None,
            smtp_api_key: None,
            slack_webhook_url: None,
            servicenow_base_url: None,
            servicenow_token: None,
            helpscout_base_url: None,
            helpscout_api_key: None,
            goalert_base_url: None,
            goalert_token: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid environment configuration: {e}"))?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay_ms: self.retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_failure_threshold,
            cooldown_ms: self.circuit_cooldown_ms,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            capacity: self.rate_limit_capacity,
            window_ms: self.rate_limit_window_ms,
        }
    }
}
