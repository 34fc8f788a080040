//! Tests for the fallback dispatcher.
//!
//! - strategies.rs: built-in and custom providers
//! - composition.rs: fallback placed outside retry and timeout

mod strategies;

use std::fmt;

/// Test error type for use in test services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError {
    pub message: String,
    pub code: u32,
}

impl TestError {
    pub fn new(message: &str, code: u32) -> Self {
        Self {
            message: message.to_string(),
            code,
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for TestError {}
