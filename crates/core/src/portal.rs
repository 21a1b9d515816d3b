// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portals: private point-to-point buffers between two named agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum messages buffered in one portal before the oldest is dropped.
pub const PORTAL_BUFFER_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalMessage {
    pub from: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// A private channel with exactly two endpoints. At most one open portal
/// per owner at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub owner: String,
    pub peer: String,
    #[serde(default)]
    pub messages: VecDeque<PortalMessage>,
    pub opened_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Portal {
    pub fn new(owner: impl Into<String>, peer: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            owner: owner.into(),
            peer: peer.into(),
            messages: VecDeque::new(),
            opened_at: now,
            last_activity: now,
        }
    }

    /// True when `agent` is one of the two endpoints.
    pub fn involves(&self, agent: &str) -> bool {
        self.owner == agent || self.peer == agent
    }

    /// Append a message, dropping the oldest at capacity.
    pub fn push(&mut self, from: impl Into<String>, content: impl Into<String>, now: DateTime<Utc>) {
        if self.messages.len() >= PORTAL_BUFFER_CAP {
            self.messages.pop_front();
        }
        self.messages.push_back(PortalMessage {
            from: from.into(),
            content: content.into(),
            sent_at: now,
        });
        self.last_activity = now;
    }
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;
