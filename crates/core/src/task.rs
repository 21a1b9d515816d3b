// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks on the shared board and their status state machine.
//!
//! ```text
//!  Todo ──claim──▶ Claimed ──start──▶ InProgress
//!   │                │  │                 │
//!   │                │  └──────release────┘──▶ back to Todo
//!   │                └────────done────────────▶ Done
//!   └──cancel──▶ Cancelled          (done also legal from Claimed)
//! ```
//!
//! Done and Cancelled are terminal: a task never transitions out of them.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a task on the shared board, shaped `task-<N>`.
    pub struct TaskId;
}

impl TaskId {
    /// Build a task id from the board counter.
    pub fn from_index(n: u64) -> Self {
        Self(format!("task-{n}"))
    }

    /// Numeric board index, if this id is well-formed.
    pub fn index(&self) -> Option<u64> {
        self.0.strip_prefix("task-")?.parse().ok()
    }
}

/// Highest-urgency priority value.
pub const PRIORITY_MIN: u8 = 1;
/// Lowest-urgency priority value.
pub const PRIORITY_MAX: u8 = 5;

/// Validate a task priority (1 = highest, 5 = lowest).
pub fn validate_priority(priority: u8) -> Result<(), Error> {
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        return Err(Error::Schema {
            detail: format!("priority must be {PRIORITY_MIN}-{PRIORITY_MAX}, got {priority}"),
        });
    }
    Ok(())
}

/// Status of a task through its lifecycle. Each variant carries the
/// fields that only exist in that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Claimed {
        assignee: String,
        claimed_at: DateTime<Utc>,
    },
    InProgress {
        assignee: String,
        started_at: DateTime<Utc>,
    },
    Done {
        assignee: String,
        completed_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Cancelled {
        cancelled_by: String,
        cancelled_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Claimed { .. } => "claimed",
            TaskStatus::InProgress { .. } => "in_progress",
            TaskStatus::Done { .. } => "done",
            TaskStatus::Cancelled { .. } => "cancelled",
        }
    }

    /// The agent this status assigns, if any.
    pub fn assignee(&self) -> Option<&str> {
        match self {
            TaskStatus::Claimed { assignee, .. }
            | TaskStatus::InProgress { assignee, .. }
            | TaskStatus::Done { assignee, .. } => Some(assignee),
            _ => None,
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done { .. } | TaskStatus::Cancelled { .. })
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A unit of work on the shared board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 1 = highest urgency, 5 = lowest
    pub priority: u8,
    /// Files this task expects to touch (informational; locking is separate)
    #[serde(default)]
    pub files: Vec<String>,
    /// Capabilities an agent must advertise to pick this task via `claim_next`.
    /// Empty means any agent qualifies.
    #[serde(default)]
    pub required_caps: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: u8,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            priority,
            files: Vec::new(),
            required_caps: Vec::new(),
            created_at,
            status: TaskStatus::Todo,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
