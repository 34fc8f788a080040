//! Tests for the retry middleware.
//!
//! - behavior.rs: attempt counting, numbering and delays
//! - budget.rs: `max_duration` handling
//! - predicates.rs: `retry_on`/`abort_on` filtering

mod behavior;

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower_fault_tolerance_core::Attempt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    ConnectionFailed,
    BadRequest,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::ConnectionFailed => write!(f, "Connection failed"),
            TestError::BadRequest => write!(f, "Bad request"),
        }
    }
}

impl std::error::Error for TestError {}

/// An operation that fails with `error` until attempt `succeed_on`, counting
/// every call.
pub fn flaky(
    calls: Arc<AtomicUsize>,
    succeed_on: usize,
    error: TestError,
) -> impl Fn(Attempt<u32>) -> BoxFuture<'static, Result<u32, TestError>> + Clone {
    move |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        let error = error.clone();
        Box::pin(async move {
            if attempt.number >= succeed_on {
                Ok(attempt.request)
            } else {
                Err(error)
            }
        })
    }
}
