//! Attempt counting.

use std::task::{Context, Poll};
use tower::layer::Layer;
use tower::Service;
use tower_fault_tolerance_core::{Attempt, InvocationCounter};

/// Increments an [`InvocationCounter`] for every attempt started.
#[derive(Debug, Clone)]
pub struct CountingLayer {
    counter: InvocationCounter,
}

impl CountingLayer {
    /// Counts into `counter`.
    pub fn new(counter: InvocationCounter) -> Self {
        Self { counter }
    }
}

impl<S> Layer<S> for CountingLayer {
    type Service = Counting<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Counting {
            inner,
            counter: self.counter.clone(),
        }
    }
}

/// Service produced by [`CountingLayer`].
///
/// The count is taken synchronously in `call`, before the returned future
/// is polled, so an attempt that later times out is still counted.
#[derive(Debug, Clone)]
pub struct Counting<S> {
    inner: S,
    counter: InvocationCounter,
}

impl<S> Counting<S> {
    /// The counter this service increments.
    pub fn counter(&self) -> &InvocationCounter {
        &self.counter
    }
}

impl<S, Req> Service<Attempt<Req>> for Counting<S>
where
    S: Service<Attempt<Req>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, attempt: Attempt<Req>) -> Self::Future {
        let _total = self.counter.increment();

        #[cfg(feature = "tracing")]
        tracing::trace!(attempt = attempt.number, total = _total, "Attempt started");

        self.inner.call(attempt)
    }
}
