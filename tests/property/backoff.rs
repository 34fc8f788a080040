//! Property tests for retry intervals.
//!
//! Invariants tested:
//! - Jittered delays stay within `delay ± jitter`, clamped at zero
//! - Exponential intervals never decrease and respect their cap

use proptest::prelude::*;
use std::time::Duration;
use tower_fault_tolerance_retry::{ExponentialBackoff, IntervalFunction, JitteredInterval};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn jittered_delay_is_bounded(
        delay_ms in 0u64..=1_000,
        jitter_ms in 0u64..=2_000,
        retry in 0usize..10,
    ) {
        let delay = Duration::from_millis(delay_ms);
        let jitter = Duration::from_millis(jitter_ms);
        let interval = JitteredInterval::fixed(delay, jitter);

        let next = interval.next_interval(retry);

        prop_assert!(next <= delay + jitter);
        prop_assert!(next >= delay.saturating_sub(jitter));
    }

    #[test]
    fn exponential_backoff_is_monotonic_and_capped(
        initial_ms in 1u64..=500,
        cap_ms in 500u64..=10_000,
    ) {
        let cap = Duration::from_millis(cap_ms);
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms))
            .multiplier(2.0)
            .max_interval(cap);

        let mut previous = Duration::ZERO;
        for retry in 0..20 {
            let next = backoff.next_interval(retry);
            prop_assert!(next >= previous);
            prop_assert!(next <= cap);
            previous = next;
        }
    }
}
