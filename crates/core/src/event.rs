// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream events delivered to subscribers, and the persisted audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskUpdate,
    Broadcast,
    Completion,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TaskUpdate => "task_update",
            EventType::Broadcast => "broadcast",
            EventType::Completion => "completion",
            EventType::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One event pushed through the streaming fabric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event_type: EventType,
    /// Agent this event concerns (matched against subscription filters)
    pub agent: String,
    /// Opaque payload; structure is owned by the emitting operation
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    pub fn new(
        event_type: EventType,
        agent: impl Into<String>,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            agent: agent.into(),
            data,
            timestamp,
        }
    }
}

/// Facts recorded in the append-only audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    RoomInitialized { project_name: String },
    RoomReset,
    AgentJoined { name: String },
    AgentLeft { name: String, reason: String },
    TaskReverted { task_id: String, from_agent: String },
    FileLocked { file: String, by: String },
    FileUnlocked { file: String, by: String, reason: String },
    RoomPaused { by: String, reason: String },
    RoomResumed { by: String },
    AuthEnabled,
    TokenIssued { agent: String, role: String },
}

/// Timestamped audit line as written to `audit.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
