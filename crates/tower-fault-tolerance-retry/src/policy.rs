use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Classifies an error.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Decides whether and when a failed attempt is retried.
///
/// An error is retried when it matches `retry_on` (everything, if unset) and
/// does not match `abort_on`. With a `max_duration`, a retry whose delay would
/// carry the invocation past the budget is not started.
pub struct RetryPolicy<E> {
    pub(crate) max_retries: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
    pub(crate) abort_predicate: Option<RetryPredicate<E>>,
    pub(crate) max_duration: Option<Duration>,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy that retries every error up to `max_retries` times.
    pub fn new(max_retries: usize, interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            max_retries,
            interval_fn,
            retry_predicate: None,
            abort_predicate: None,
            max_duration: None,
        }
    }

    /// Only retries errors matching `predicate`.
    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Never retries errors matching `predicate`.
    pub fn with_abort_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.abort_predicate = Some(Arc::new(predicate));
        self
    }

    /// Bounds the total time spent on one invocation.
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Checks whether `error` is eligible for retry.
    pub fn should_retry(&self, error: &E) -> bool {
        let retry = match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        };
        let abort = self.abort_predicate.as_ref().is_some_and(|p| p(error));
        retry && !abort
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn next_backoff(&self, retry: usize) -> Duration {
        self.interval_fn.next_interval(retry)
    }

    /// Returns false when waiting `delay` after `elapsed` would reach the
    /// `max_duration` budget.
    pub fn within_budget(&self, elapsed: Duration, delay: Duration) -> bool {
        match self.max_duration {
            Some(max) => elapsed.saturating_add(delay) < max,
            None => true,
        }
    }
}
