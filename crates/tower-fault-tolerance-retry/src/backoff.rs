use rand::Rng;
use std::time::Duration;

/// Computes the pause between a failed attempt and the next one.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay before retry number `retry` (0-indexed, so the
    /// pause before the second attempt is `next_interval(0)`).
    fn next_interval(&self, retry: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Retries immediately.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// Delay that grows geometrically with each retry.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff doubling from `initial_interval`.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps the computed interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as usize) as i32);
        let interval = from_nanos_saturating(self.initial_interval.as_nanos() as f64 * factor);

        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

/// Wraps another interval and spreads it uniformly over
/// `[interval - jitter, interval + jitter]`, never going below zero.
///
/// A jitter larger than the base interval is accepted; the low end of the
/// range is clamped to zero.
#[derive(Debug, Clone)]
pub struct JitteredInterval<I> {
    inner: I,
    jitter: Duration,
}

impl<I> JitteredInterval<I> {
    /// Adds `jitter` to `inner`.
    pub fn new(inner: I, jitter: Duration) -> Self {
        Self { inner, jitter }
    }
}

impl JitteredInterval<FixedInterval> {
    /// A fixed `delay` randomized by up to `jitter` in either direction.
    pub fn fixed(delay: Duration, jitter: Duration) -> Self {
        Self::new(FixedInterval::new(delay), jitter)
    }
}

impl<I: IntervalFunction> IntervalFunction for JitteredInterval<I> {
    fn next_interval(&self, retry: usize) -> Duration {
        let base = self.inner.next_interval(retry);
        if self.jitter.is_zero() {
            return base;
        }

        let jitter = self.jitter.as_nanos() as f64;
        let offset = rand::rng().random_range(-jitter..=jitter);
        from_nanos_saturating(base.as_nanos() as f64 + offset)
    }
}

fn from_nanos_saturating(nanos: f64) -> Duration {
    if nanos.is_nan() || nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

/// Interval computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}
