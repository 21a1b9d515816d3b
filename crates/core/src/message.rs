// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only room messages, ordered by the room-global seq counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a room message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    /// Visible to every agent
    Broadcast,
    /// Emitted by the room itself (task reverts, vote results, ...)
    System,
    /// Mirrored copy of a portal message for the audit trail
    Portal,
}

/// One persisted message. `seq` is allocated from the room counter at
/// write time and is globally unique; gaps are legal after write failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub seq: u64,
    pub from_agent: String,
    pub msg_type: MsgType,
    pub content: String,
    /// Optional target agent this message calls out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
