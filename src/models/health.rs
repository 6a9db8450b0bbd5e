use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub targets: HashMap<String, TargetHealth>,
}

/// Health of one downstream target: its circuit state, or whether it is
/// running disabled for lack of configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetHealth {
    pub status: HealthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TargetHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            circuit_state: None,
            detail: None,
        }
    }

    pub fn circuit(state: String, healthy: bool) -> Self {
        Self {
            status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            circuit_state: Some(state),
            detail: None,
        }
    }

    pub fn disabled(detail: String) -> Self {
        Self {
            status: HealthStatus::Degraded,
            circuit_state: None,
            detail: Some(detail),
        }
    }
}
