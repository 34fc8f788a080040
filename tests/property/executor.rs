//! Property tests for the executor.
//!
//! Invariants tested:
//! - An always-failing operation is called exactly `max_retries + 1` times
//! - The fallback runs at most once, and only when every attempt failed
//! - An operation that recovers at attempt `k` is called exactly `k` times

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Runtime;
use tower_fault_tolerance::{Attempt, InvocationCounter, Policy, execute, operation_fn};

#[derive(Debug, Clone, PartialEq)]
struct TestError;

fn policy_with_counted_fallback(
    max_retries: usize,
    fallbacks: Arc<AtomicUsize>,
) -> Policy<(), String, TestError> {
    Policy::builder()
        .max_retries(max_retries)
        .fallback(move |_: &()| {
            fallbacks.fetch_add(1, Ordering::SeqCst);
            "fallback".to_string()
        })
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn always_failing_operation_then_single_fallback(max_retries in 0usize..=10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let fallbacks = Arc::new(AtomicUsize::new(0));
            let policy = policy_with_counted_fallback(max_retries, Arc::clone(&fallbacks));
            let counter = InvocationCounter::new();
            let operation = operation_fn(|_: Attempt<()>| async { Err::<String, _>(TestError) });

            let result = execute(&policy, &counter, operation, ()).await;

            prop_assert_eq!(result, Ok("fallback".to_string()));
            prop_assert_eq!(counter.get(), max_retries + 1);
            prop_assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }

    #[test]
    fn recovery_stops_retrying(max_retries in 0usize..=10, recover_at in 1usize..=11) {
        prop_assume!(recover_at <= max_retries + 1);
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let fallbacks = Arc::new(AtomicUsize::new(0));
            let policy = policy_with_counted_fallback(max_retries, Arc::clone(&fallbacks));
            let counter = InvocationCounter::new();
            let operation = operation_fn(move |attempt: Attempt<()>| async move {
                if attempt.number >= recover_at {
                    Ok(format!("attempt {}", attempt.number))
                } else {
                    Err(TestError)
                }
            });

            let result = execute(&policy, &counter, operation, ()).await;

            prop_assert_eq!(result, Ok(format!("attempt {}", recover_at)));
            prop_assert_eq!(counter.get(), recover_at);
            prop_assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
            Ok(())
        })?;
    }

    #[test]
    fn counter_accumulates_across_executions(max_retries in 0usize..=5, runs in 1usize..=4) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let fallbacks = Arc::new(AtomicUsize::new(0));
            let policy = policy_with_counted_fallback(max_retries, Arc::clone(&fallbacks));
            let counter = InvocationCounter::new();

            for _ in 0..runs {
                let operation = operation_fn(|_: Attempt<()>| async { Err::<String, _>(TestError) });
                let _ = execute(&policy, &counter, operation, ()).await;
            }

            prop_assert_eq!(counter.get(), runs * (max_retries + 1));
            prop_assert_eq!(fallbacks.load(Ordering::SeqCst), runs);
            Ok(())
        })?;
    }
}
