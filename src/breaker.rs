use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::DeliveryError;
use crate::models::circuit_breaker::{CircuitBreakerConfig, CircuitState};

struct TargetState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    /// When the current half-open trial claimed its slot. A claim older
    /// than the cooldown counts as abandoned (the driving future was
    /// dropped mid-call) and the slot is reclaimed by the next caller.
    trial_started_at: Option<Instant>,
}

impl TargetState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_failure_at: None,
            trial_started_at: None,
        }
    }
}

/// Per-target failure-state machine shared across all deliveries.
///
/// State is process-wide and mutated only through this type; callers check
/// admission before each attempt and report the outcome afterwards. An open
/// circuit rejects calls until `cooldown_ms` has elapsed, after which exactly
/// one trial call is admitted before the circuit resolves to closed or open.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    targets: Mutex<HashMap<String, TargetState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Admission check, run before every attempt. Fails fast with
    /// `CircuitOpen` without touching the downstream target.
    pub fn check(&self, target: &str) -> Result<(), DeliveryError> {
        let mut targets = self.targets.lock().unwrap();
        let entry = targets
            .entry(target.to_string())
            .or_insert_with(TargetState::new);

        match entry.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = entry
                    .opened_at
                    .is_some_and(|t| t.elapsed().as_millis() as u64 >= self.config.cooldown_ms);

                if cooled_down {
                    info!(target, "circuit breaker cooldown elapsed, admitting trial call");
                    entry.state = CircuitState::HalfOpen;
                    entry.trial_started_at = Some(Instant::now());
                    Ok(())
                } else {
                    debug!(target, "circuit breaker open, rejecting call");
                    Err(DeliveryError::CircuitOpen {
                        target: target.to_string(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                // Only one trial at a time; concurrent callers fail fast.
                // A claim the caller never resolved expires after the
                // cooldown so a cancelled trial cannot wedge the target.
                match entry.trial_started_at {
                    Some(started)
                        if (started.elapsed().as_millis() as u64) < self.config.cooldown_ms =>
                    {
                        Err(DeliveryError::CircuitOpen {
                            target: target.to_string(),
                        })
                    }
                    _ => {
                        entry.trial_started_at = Some(Instant::now());
                        Ok(())
                    }
                }
            }
        }
    }

    pub fn record_success(&self, target: &str) {
        let mut targets = self.targets.lock().unwrap();
        let entry = targets
            .entry(target.to_string())
            .or_insert_with(TargetState::new);

        match entry.state {
            CircuitState::HalfOpen => {
                info!(target, "circuit breaker closed after successful trial");
                entry.state = CircuitState::Closed;
                entry.consecutive_failures = 0;
                entry.opened_at = None;
                entry.trial_started_at = None;
            }
            CircuitState::Closed => {
                entry.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, target: &str) {
        let mut targets = self.targets.lock().unwrap();
        let entry = targets
            .entry(target.to_string())
            .or_insert_with(TargetState::new);
        entry.last_failure_at = Some(Instant::now());

        match entry.state {
            CircuitState::HalfOpen => {
                warn!(target, "circuit breaker reopened after failed trial");
                entry.state = CircuitState::Open;
                entry.opened_at = Some(Instant::now());
                entry.trial_started_at = None;
            }
            CircuitState::Closed => {
                entry.consecutive_failures += 1;
                debug!(
                    target,
                    failures = entry.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    "circuit breaker failure recorded"
                );

                if entry.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        target,
                        failures = entry.consecutive_failures,
                        "circuit breaker opened after consecutive failures"
                    );
                    entry.state = CircuitState::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Releases a claimed half-open trial slot when the attempt never
    /// reached the target (e.g. missing configuration). The circuit stays
    /// half-open and the next caller takes the trial.
    pub fn release_trial(&self, target: &str) {
        let mut targets = self.targets.lock().unwrap();
        if let Some(entry) = targets.get_mut(target) {
            if entry.state == CircuitState::HalfOpen {
                entry.trial_started_at = None;
            }
        }
    }

    pub fn state_of(&self, target: &str) -> CircuitState {
        let targets = self.targets.lock().unwrap();
        targets
            .get(target)
            .map(|t| t.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Current state of every target the breaker has seen, for health
    /// reporting.
    pub fn snapshot(&self) -> HashMap<String, CircuitState> {
        let targets = self.targets.lock().unwrap();
        targets
            .iter()
            .map(|(name, t)| (name.clone(), t.state))
            .collect()
    }
}
