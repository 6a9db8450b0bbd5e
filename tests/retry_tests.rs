use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use anyhow::Result;
use delivery_engine::{
    breaker::CircuitBreaker,
    errors::DeliveryError,
    models::{circuit_breaker::CircuitBreakerConfig, retry::RetryPolicy},
    retry::{backoff_delay, execute},
};

use crate::common::{permanent, transient};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay_ms: 10,
        max_delay_ms: 100,
    }
}

fn breaker() -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 100,
        cooldown_ms: 60_000,
    })
}

/// Test: Successful operations complete without retry
#[tokio::test]
async fn test_successful_operation_no_retry() -> Result<()> {
    let breaker = breaker();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let attempted = execute(&fast_policy(3), &breaker, "target", || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DeliveryError>("success")
        }
    })
    .await;

    assert_eq!(attempted.outcome.unwrap(), "success");
    assert_eq!(attempted.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "Should only attempt once");

    Ok(())
}

/// Test: Transient failures are retried until success
#[tokio::test]
async fn test_transient_failures_are_retried() -> Result<()> {
    let breaker = breaker();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let attempted = execute(&fast_policy(5), &breaker, "target", || {
        let counter = Arc::clone(&counter);
        async move {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                Err(transient("connection reset"))
            } else {
                Ok("success")
            }
        }
    })
    .await;

    assert!(attempted.outcome.is_ok());
    assert_eq!(attempted.attempts, 3, "Should retry twice then succeed");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    Ok(())
}

/// Test: Permanent failures abort immediately without retry
#[tokio::test]
async fn test_permanent_failure_aborts_immediately() -> Result<()> {
    let breaker = breaker();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let attempted = execute(&fast_policy(5), &breaker, "target", || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(permanent("422 unprocessable"))
        }
    })
    .await;

    assert!(matches!(
        attempted.outcome,
        Err(DeliveryError::Permanent { .. })
    ));
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "Permanent failure must not be retried"
    );

    Ok(())
}

/// Test: Transient failures exhaust exactly max_attempts attempts
#[tokio::test]
async fn test_transient_failure_exhausts_budget() -> Result<()> {
    let breaker = breaker();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let attempted = execute(&fast_policy(4), &breaker, "target", || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(transient("503"))
        }
    })
    .await;

    assert!(matches!(
        attempted.outcome,
        Err(DeliveryError::Transient { .. })
    ));
    assert_eq!(attempted.attempts, 4);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        4,
        "Should attempt exactly max_attempts times"
    );

    Ok(())
}

/// Test: An open circuit is terminal, uninvoked, and consumes no budget
#[tokio::test]
async fn test_open_circuit_is_terminal() -> Result<()> {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 1,
        cooldown_ms: 60_000,
    });

    // Trip the breaker.
    breaker.check("target").unwrap();
    breaker.record_failure("target");

    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let attempted = execute(&fast_policy(3), &breaker, "target", || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), DeliveryError>(())
        }
    })
    .await;

    assert!(matches!(
        attempted.outcome,
        Err(DeliveryError::CircuitOpen { .. })
    ));
    assert_eq!(attempted.attempts, 0, "No retry budget consumed");
    assert_eq!(
        calls.load(Ordering::SeqCst),
        0,
        "Operation must not be invoked while circuit is open"
    );

    Ok(())
}

/// Test: Configuration-missing failures do not trip the circuit
#[tokio::test]
async fn test_configuration_missing_does_not_poison_circuit() -> Result<()> {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 1,
        cooldown_ms: 60_000,
    });

    let attempted = execute(&fast_policy(3), &breaker, "email", || async {
        Err::<(), _>(DeliveryError::ConfigurationMissing {
            target: "email".to_string(),
        })
    })
    .await;

    assert!(matches!(
        attempted.outcome,
        Err(DeliveryError::ConfigurationMissing { .. })
    ));

    // The next call must still be admitted.
    assert!(breaker.check("email").is_ok());

    Ok(())
}

/// Test: Backoff delays fall in the full-jitter ranges
#[tokio::test]
async fn test_backoff_delay_ranges() -> Result<()> {
    let policy = RetryPolicy {
        max_attempts: 4,
        base_delay_ms: 1_000,
        max_delay_ms: 30_000,
    };

    for _ in 0..50 {
        assert!(backoff_delay(&policy, 2).as_millis() < 1_000);
        assert!(backoff_delay(&policy, 3).as_millis() < 2_000);
        assert!(backoff_delay(&policy, 4).as_millis() < 4_000);
    }

    Ok(())
}

/// Test: Backoff ceiling is capped at max_delay_ms
#[tokio::test]
async fn test_backoff_delay_cap() -> Result<()> {
    let policy = RetryPolicy {
        max_attempts: 10,
        base_delay_ms: 1_000,
        max_delay_ms: 1_500,
    };

    for _ in 0..50 {
        assert!(backoff_delay(&policy, 8).as_millis() < 1_500);
    }

    Ok(())
}

/// Test: Jitter varies the delay between samples
#[tokio::test]
async fn test_jitter_varies_delays() -> Result<()> {
    let policy = RetryPolicy {
        max_attempts: 4,
        base_delay_ms: 10_000,
        max_delay_ms: 60_000,
    };

    let samples: Vec<u128> = (0..20).map(|_| backoff_delay(&policy, 3).as_millis()).collect();
    let min = samples.iter().min().unwrap();
    let max = samples.iter().max().unwrap();

    assert!(
        max > min,
        "Delays should vary due to jitter (min: {min}, max: {max})"
    );

    Ok(())
}
