// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The singleton room record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wire/storage protocol version for room records.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Singleton coordination state for one `base_path`.
///
/// `message_seq` is the next seq to allocate: it never decreases and is
/// always one past the largest seq ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub protocol_version: String,
    pub project_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub message_seq: u64,
    #[serde(default)]
    pub active_agents: BTreeSet<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn new(project_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            project_name: project_name.into(),
            started_at: now,
            message_seq: 0,
            active_agents: BTreeSet::new(),
            paused: false,
            pause_reason: None,
            paused_by: None,
            paused_at: None,
        }
    }

    pub fn pause(&mut self, by: impl Into<String>, reason: impl Into<String>, now: DateTime<Utc>) {
        self.paused = true;
        self.pause_reason = Some(reason.into());
        self.paused_by = Some(by.into());
        self.paused_at = Some(now);
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.pause_reason = None;
        self.paused_by = None;
        self.paused_at = None;
    }
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
