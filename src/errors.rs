use thiserror::Error;

/// Failure taxonomy for delivery and integration calls.
///
/// The retry controller only ever retries `Transient` failures. `CircuitOpen`
/// is terminal and consumes no retry budget; `ConfigurationMissing` surfaces
/// as a skipped channel rather than a failed one.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("invalid notification: {0}")]
    Validation(String),

    #[error("no usable client configured for '{target}'")]
    ConfigurationMissing { target: String },

    #[error("transient failure: {reason}")]
    Transient { reason: String },

    #[error("permanent failure: {reason}")]
    Permanent { reason: String },

    #[error("circuit breaker is open for '{target}'")]
    CircuitOpen { target: String },

    #[error("rate limit exceeded for '{target}'")]
    RateLimitExceeded { target: String },
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient { .. })
    }

    /// Short machine-readable tag recorded in channel results and audit logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::Validation(_) => "validation",
            DeliveryError::ConfigurationMissing { .. } => "configuration_missing",
            DeliveryError::Transient { .. } => "transient",
            DeliveryError::Permanent { .. } => "permanent",
            DeliveryError::CircuitOpen { .. } => "circuit_open",
            DeliveryError::RateLimitExceeded { .. } => "rate_limited",
        }
    }

    /// Classifies an HTTP response status: 5xx and 429 are retryable, any
    /// other 4xx is not.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if status >= 500 || status == 429 {
            DeliveryError::Transient {
                reason: format!("downstream returned {status}: {detail}"),
            }
        } else {
            DeliveryError::Permanent {
                reason: format!("downstream returned {status}: {detail}"),
            }
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return DeliveryError::from_status(status.as_u16(), err.to_string());
        }

        // Timeouts and connection resets are worth another attempt.
        DeliveryError::Transient {
            reason: err.to_string(),
        }
    }
}
