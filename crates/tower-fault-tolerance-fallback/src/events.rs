//! Events emitted by the fallback service.

use std::time::Instant;
use tower_fault_tolerance_core::FaultToleranceEvent;

/// Events emitted by the fallback service.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// The inner service succeeded; no fallback was needed.
    Success {
        pattern_name: String,
        timestamp: Instant,
    },

    /// The inner service failed; the fallback will be called.
    FailedAttempt {
        pattern_name: String,
        timestamp: Instant,
    },

    /// The fallback produced a response.
    Applied {
        pattern_name: String,
        timestamp: Instant,
        /// The provider kind, e.g. `"value"` or `"service"`.
        strategy: &'static str,
    },

    /// The fallback itself failed.
    Failed {
        pattern_name: String,
        timestamp: Instant,
    },

    /// The error was not handled, or no fallback is configured; it was
    /// propagated as-is.
    Skipped {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl FaultToleranceEvent for FallbackEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::FailedAttempt { .. } => "failed_attempt",
            Self::Applied { .. } => "applied",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Success { timestamp, .. }
            | Self::FailedAttempt { timestamp, .. }
            | Self::Applied { timestamp, .. }
            | Self::Failed { timestamp, .. }
            | Self::Skipped { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::Success { pattern_name, .. }
            | Self::FailedAttempt { pattern_name, .. }
            | Self::Applied { pattern_name, .. }
            | Self::Failed { pattern_name, .. }
            | Self::Skipped { pattern_name, .. } => pattern_name,
        }
    }
}
