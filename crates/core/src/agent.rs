// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent records and name validation.

use crate::error::Error;
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum agent name length in bytes.
pub const AGENT_NAME_MAX: usize = 64;

/// Validate an agent name: 1–64 chars from `[A-Za-z0-9_-]`.
///
/// Names become file names under the room directory, so path separators
/// and anything outside the allowed set are rejected outright.
pub fn validate_agent_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > AGENT_NAME_MAX {
        return Err(Error::Schema {
            detail: format!("agent name must be 1-{AGENT_NAME_MAX} characters"),
        });
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(Error::Schema {
            detail: format!("agent name may only contain [A-Za-z0-9_-]: {name:?}"),
        });
    }
    Ok(())
}

/// Liveness/availability status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Busy,
    Idle,
    Inactive,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Opaque metadata an agent reports at join time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Agent kind, e.g. "claude", "codex", "human"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task: Option<String>,
}

/// One registered agent in the room, keyed by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Task currently assigned to this agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<TaskId>,
    pub joined_at: DateTime<Utc>,
    /// Updated on every command the agent issues
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub meta: AgentMeta,
}

impl AgentRecord {
    pub fn new(name: impl Into<String>, capabilities: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Active,
            capabilities,
            current_task: None,
            joined_at: now,
            last_seen: now,
            meta: AgentMeta::default(),
        }
    }

    /// Inactive agents keep their record but cannot issue commands.
    pub fn is_active(&self) -> bool {
        self.status != AgentStatus::Inactive
    }

    /// True when every required capability is advertised by this agent.
    pub fn has_capabilities(&self, required: &[String]) -> bool {
        required.iter().all(|cap| self.capabilities.contains(cap))
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
