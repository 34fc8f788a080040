//! Tests for the timeout supervisor.
//!
//! - deadline.rs: classification of attempts against their deadline
//! - cancellation.rs: what happens to an attempt that overruns

mod cancellation;
