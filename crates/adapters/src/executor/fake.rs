// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic executor fake for tests.

use super::{Executor, ExecutorError, ExecutorOutput};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One recorded call to [`FakeExecutor::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRun {
    pub prompt: String,
    pub deadline: Duration,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<FakeRun>,
    scripted: VecDeque<Result<ExecutorOutput, ExecutorError>>,
    delay: Option<Duration>,
}

/// Records every run; returns scripted results in order, then a default
/// success with the prompt echoed back.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next un-scripted call.
    pub fn script(&self, result: Result<ExecutorOutput, ExecutorError>) {
        self.state.lock().scripted.push_back(result);
    }

    pub fn script_ok(&self, output: &str) {
        self.script(Ok(ExecutorOutput {
            output: output.to_string(),
        }));
    }

    pub fn script_err(&self, message: &str) {
        self.script(Err(ExecutorError::Failed(message.to_string())));
    }

    /// Make every run sleep first, to keep loops observably busy in tests.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<FakeRun> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

impl Executor for FakeExecutor {
    fn run(&self, prompt: &str, deadline: Duration) -> Result<ExecutorOutput, ExecutorError> {
        let (result, delay) = {
            let mut state = self.state.lock();
            state.calls.push(FakeRun {
                prompt: prompt.to_string(),
                deadline,
            });
            let result = state.scripted.pop_front().unwrap_or_else(|| {
                Ok(ExecutorOutput {
                    output: format!("ran: {prompt}"),
                })
            });
            (result, state.delay)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
