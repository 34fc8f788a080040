//! Core infrastructure for tower-fault-tolerance.
//!
//! This crate provides the types shared by the timeout, retry, and fallback
//! middleware:
//! - [`Attempt`]: the request envelope handed to an operation for one attempt,
//!   carrying its number and a cancellation signal
//! - [`AttemptError`] and [`Outcome`]: how a single attempt ended
//! - [`InvocationCounter`]: caller-owned count of attempts started
//! - Event system for observability

pub mod attempt;
pub mod counter;
pub mod events;

pub use attempt::{Attempt, AttemptError, Outcome, OutcomeKind};
pub use counter::InvocationCounter;
pub use events::{EventListener, EventListeners, FaultToleranceEvent, FnListener};

/// Re-exported so operations can name the cancellation signal without a
/// direct `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
