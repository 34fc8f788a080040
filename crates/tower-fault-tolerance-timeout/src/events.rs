//! Event types for the timeout supervisor.

use std::time::{Duration, Instant};
use tower_fault_tolerance_core::FaultToleranceEvent;

/// Events emitted by the timeout supervisor.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// An attempt produced a value before its deadline.
    Success {
        /// The name of the timeout instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt number.
        attempt: usize,
        /// How long the attempt took.
        duration: Duration,
    },
    /// An attempt failed with an error before its deadline.
    Error {
        /// The name of the timeout instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt number.
        attempt: usize,
        /// How long before the error occurred.
        duration: Duration,
    },
    /// An attempt was abandoned at its deadline.
    Timeout {
        /// The name of the timeout instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt number.
        attempt: usize,
        /// The configured deadline.
        timeout_duration: Duration,
    },
}

impl TimeoutEvent {
    /// Returns the attempt number this event refers to.
    pub fn attempt(&self) -> usize {
        match self {
            TimeoutEvent::Success { attempt, .. }
            | TimeoutEvent::Error { attempt, .. }
            | TimeoutEvent::Timeout { attempt, .. } => *attempt,
        }
    }
}

impl FaultToleranceEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeoutEvent::Success { .. } => "success",
            TimeoutEvent::Error { .. } => "error",
            TimeoutEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeoutEvent::Success { timestamp, .. }
            | TimeoutEvent::Error { timestamp, .. }
            | TimeoutEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeoutEvent::Success { pattern_name, .. }
            | TimeoutEvent::Error { pattern_name, .. }
            | TimeoutEvent::Timeout { pattern_name, .. } => pattern_name,
        }
    }
}
