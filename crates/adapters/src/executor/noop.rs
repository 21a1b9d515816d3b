// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op executor for presets that only drain the board.

use super::{Executor, ExecutorError, ExecutorOutput};
use std::time::Duration;

/// Executor that performs no external work and reports success.
#[derive(Clone, Default)]
pub struct NoOpExecutor;

impl Executor for NoOpExecutor {
    fn run(&self, prompt: &str, _deadline: Duration) -> Result<ExecutorOutput, ExecutorError> {
        tracing::debug!(prompt_len = prompt.len(), "noop executor run");
        Ok(ExecutorOutput {
            output: String::new(),
        })
    }
}
