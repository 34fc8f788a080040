//! Caller-owned invocation counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how many attempts were started against an operation.
///
/// The counter belongs to the caller's context (for example one per logical
/// request). Cloning yields another handle to the same count, so the
/// middleware can hold one handle while the caller reads through another.
///
/// ```rust
/// use tower_fault_tolerance_core::InvocationCounter;
///
/// let counter = InvocationCounter::new();
/// let handle = counter.clone();
/// handle.increment();
/// assert_eq!(counter.get(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InvocationCounter {
    count: Arc<AtomicUsize>,
}

impl InvocationCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one started attempt and returns the new total.
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the number of attempts recorded so far.
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns true if both handles share the same underlying count.
    pub fn same_as(&self, other: &InvocationCounter) -> bool {
        Arc::ptr_eq(&self.count, &other.count)
    }
}
