use std::future::Future;

use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::errors::DeliveryError;
use crate::models::retry::RetryPolicy;

/// Outcome of a retried operation, carrying how many attempts were actually
/// made. `attempts` stays 0 when the circuit rejected the call before the
/// first attempt.
pub struct Attempted<T> {
    pub outcome: Result<T, DeliveryError>,
    pub attempts: u32,
}

/// Runs one logical operation against `target` with bounded retries.
///
/// Each attempt is admitted through the circuit breaker first; an open
/// circuit is terminal and consumes no retry budget. Permanent failures
/// abort immediately. Transient failures back off with full jitter: the
/// delay before attempt `n` is drawn uniformly from
/// `[0, min(max_delay, base * 2^(n-2)))`.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    target: &str,
    op: F,
) -> Attempted<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DeliveryError>>,
{
    let mut attempts = 0u32;

    loop {
        if let Err(e) = breaker.check(target) {
            return Attempted {
                outcome: Err(e),
                attempts,
            };
        }

        attempts += 1;

        match op().await {
            Ok(value) => {
                breaker.record_success(target);
                if attempts > 1 {
                    info!(target, attempts, "delivery succeeded after retry");
                }
                return Attempted {
                    outcome: Ok(value),
                    attempts,
                };
            }
            Err(e) => {
                // A missing configuration means no call reached the target;
                // it must not poison the circuit, and any trial slot the
                // admission check claimed goes back immediately.
                if matches!(e, DeliveryError::ConfigurationMissing { .. }) {
                    breaker.release_trial(target);
                    return Attempted {
                        outcome: Err(e),
                        attempts,
                    };
                }

                breaker.record_failure(target);

                if !e.is_transient() {
                    debug!(target, error = %e, "permanent failure, not retrying");
                    return Attempted {
                        outcome: Err(e),
                        attempts,
                    };
                }

                if attempts >= policy.max_attempts {
                    warn!(
                        target,
                        attempts,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "retry budget exhausted"
                    );
                    return Attempted {
                        outcome: Err(e),
                        attempts,
                    };
                }

                let delay = backoff_delay(policy, attempts + 1);
                debug!(
                    target,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

/// Full-jitter backoff: uniform in `[0, min(max_delay, base * 2^(n-2)))`
/// for attempt `n >= 2`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    debug_assert!(attempt >= 2);

    let exp = attempt.saturating_sub(2).min(32);
    let ceiling = policy
        .base_delay_ms
        .saturating_mul(1u64 << exp)
        .min(policy.max_delay_ms);

    if ceiling == 0 {
        return Duration::ZERO;
    }

    Duration::from_millis(rand::random_range(0..ceiling))
}
