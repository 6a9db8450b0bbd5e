#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum tokens a bucket holds; also the burst size.
    pub capacity: u32,
    /// Time for an empty bucket to refill completely.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 60,
            window_ms: 60_000,
        }
    }
}
