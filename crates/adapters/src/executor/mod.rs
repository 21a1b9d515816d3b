// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External executor adapters

mod noop;

pub use noop::NoOpExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeExecutor, FakeRun};

use std::time::Duration;
use thiserror::Error;

/// Errors from executor runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("executor failed: {0}")]
    Failed(String),
    #[error("executor exceeded its deadline")]
    Timeout,
    #[error("executor was cancelled: {0}")]
    Cancelled(String),
}

/// Output of one successful executor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOutput {
    pub output: String,
}

impl ExecutorOutput {
    /// First `n` characters, for task completion notes.
    pub fn excerpt(&self, n: usize) -> &str {
        let end = self
            .output
            .char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(self.output.len());
        &self.output[..end]
    }
}

/// Adapter that runs one task payload to completion.
///
/// Implementations block the calling (worker-pool) thread up to
/// `deadline`; the walph loop owns retry and reporting policy.
pub trait Executor: Send + Sync + 'static {
    fn run(&self, prompt: &str, deadline: Duration) -> Result<ExecutorOutput, ExecutorError>;
}
