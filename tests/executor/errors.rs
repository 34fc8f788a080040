use super::{Request, ServiceError, connection_failed, slow};
use std::time::Duration;
use tower_fault_tolerance::{
    AttemptError, ExecuteError, InvocationCounter, Policy, PolicyError, execute, operation_fn,
};

#[tokio::test]
async fn exhausted_without_fallback() {
    let policy = Policy::<Request, String, ServiceError>::builder()
        .max_retries(1)
        .build()
        .unwrap();
    let counter = InvocationCounter::new();

    let err = execute(&policy, &counter, operation_fn(connection_failed), "serviceA")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecuteError::ExhaustedRetries {
            attempts: 2,
            last: AttemptError::Operation(ServiceError("Connection failed")),
        }
    );
    assert_eq!(
        err.to_string(),
        "retries exhausted after 2 attempts: operation failed: Connection failed"
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_by_timeouts() {
    let policy = Policy::<Request, String, ServiceError>::builder()
        .max_retries(2)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let counter = InvocationCounter::new();

    let err = execute(&policy, &counter, operation_fn(slow(Duration::from_secs(1))), "serviceC")
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
    assert!(err.is_timeout());
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(counter.get(), 3);
}

#[tokio::test]
async fn aborted_when_not_retryable() {
    let policy = Policy::<Request, String, ServiceError>::builder()
        .max_retries(5)
        .retry_on(|error| error.is_timeout())
        .build()
        .unwrap();
    let counter = InvocationCounter::new();

    let err = execute(&policy, &counter, operation_fn(connection_failed), "serviceA")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecuteError::Aborted {
            attempts: 1,
            cause: AttemptError::Operation(ServiceError("Connection failed")),
        }
    );
    assert_eq!(counter.get(), 1);
}

#[tokio::test]
async fn apply_on_restricts_the_fallback() {
    let policy = Policy::<Request, String, ServiceError>::builder()
        .max_retries(0)
        .fallback_value("fallback".to_string())
        .apply_on(|error| error.is_timeout())
        .build()
        .unwrap();
    let counter = InvocationCounter::new();

    let err = execute(&policy, &counter, operation_fn(connection_failed), "serviceA")
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
    assert!(!err.is_timeout());
}

#[test]
fn invalid_policies_are_rejected() {
    let err = Policy::<Request, String, ServiceError>::builder()
        .delay(Duration::from_secs(1))
        .max_duration(Duration::from_millis(500))
        .build()
        .err();

    assert_eq!(
        err,
        Some(PolicyError::MaxDurationNotAboveDelay {
            max_duration: Duration::from_millis(500),
            delay: Duration::from_secs(1),
        })
    );
}

#[test]
fn jitter_larger_than_delay_is_accepted() {
    let policy = Policy::<Request, String, ServiceError>::builder()
        .delay(Duration::from_millis(10))
        .jitter(Duration::from_millis(100))
        .build();

    assert!(policy.is_ok());
}
