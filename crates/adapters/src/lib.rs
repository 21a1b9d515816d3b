// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-adapters: Seams to the processes the room coordinates.
//!
//! The core never shells out directly; the walph loop hands prompts to
//! an injected [`Executor`] and records whatever comes back.

pub mod executor;

pub use executor::{Executor, ExecutorError, ExecutorOutput, NoOpExecutor};

#[cfg(any(test, feature = "test-support"))]
pub use executor::{FakeExecutor, FakeRun};
