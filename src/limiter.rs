use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;

use crate::models::rate_limit::RateLimitConfig;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-target token bucket. Tokens refill continuously at
/// `capacity / window` per second, capped at `capacity`; acquisition is
/// non-blocking and buckets never share tokens across targets.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to take `cost` tokens from the target's bucket. Returns
    /// false immediately when the bucket cannot cover the cost; the caller
    /// decides whether to reject or defer.
    pub fn try_acquire(&self, target: &str, cost: u32) -> bool {
        let capacity = self.config.capacity as f64;
        let refill_per_sec = capacity / (self.config.window_ms as f64 / 1000.0);

        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(target.to_string()).or_insert_with(|| Bucket {
            tokens: capacity,
            last_refill: Instant::now(),
        });

        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_per_sec).min(capacity);
        bucket.last_refill = Instant::now();

        let cost = cost as f64;
        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            true
        } else {
            debug!(
                target,
                tokens = bucket.tokens,
                cost,
                "rate limit bucket exhausted"
            );
            false
        }
    }
}
