use std::fmt;
use std::time::{Duration, Instant};
use tower_fault_tolerance_core::FaultToleranceEvent;

/// Why a retry sequence stopped before running out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The error did not match `retry_on`, or matched `abort_on`.
    NotRetryable,
    /// The next retry would have exceeded `max_duration`.
    MaxDurationExceeded,
}

impl AbortReason {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::NotRetryable => "not_retryable",
            AbortReason::MaxDurationExceeded => "max_duration",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// Attempt `attempt` failed and another attempt starts after `delay`.
    Retry {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// An attempt succeeded.
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The last permitted attempt failed.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// A failure ended the sequence early.
    Aborted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        reason: AbortReason,
    },
}

impl FaultToleranceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Aborted { .. } => "aborted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Aborted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::Aborted { pattern_name, .. } => pattern_name,
        }
    }
}
