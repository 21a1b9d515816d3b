// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers for tests in this crate and downstream crates.
//!
//! Only compiled for tests or with the `test-support` feature.

use crate::agent::AgentRecord;
use crate::clock::{Clock, FakeClock};
use crate::task::{Task, TaskId};

/// A fake clock pinned to a known epoch for deterministic timestamps.
pub fn fixed_clock() -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    clock
}

/// A todo task with sensible defaults.
pub fn todo_task(index: u64, title: &str, priority: u8) -> Task {
    Task::new(
        TaskId::from_index(index),
        title,
        format!("{title} description"),
        priority,
        fixed_clock().now_utc(),
    )
}

/// An active agent with the given capabilities.
pub fn active_agent(name: &str, capabilities: &[&str]) -> AgentRecord {
    AgentRecord::new(
        name,
        capabilities.iter().map(|c| c.to_string()).collect(),
        fixed_clock().now_utc(),
    )
}
