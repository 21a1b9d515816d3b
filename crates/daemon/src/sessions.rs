// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session → agent mapping for transport adapters.
//!
//! The gate assigns a session id on first contact; adapters echo it on
//! later requests. Invalid or missing ids get a fresh one. Read-mostly,
//! one mutex.

use masc_core::{generate_session_id, validate_session_id, Clock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub agent: Option<String>,
    pub created_at_ms: u64,
    pub last_seen_ms: u64,
}

pub struct SessionTable<C: Clock> {
    clock: C,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl<C: Clock> SessionTable<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the caller's session: echo a valid known or unknown id
    /// (registering it), replace anything invalid with a fresh id.
    pub fn ensure(&self, provided: Option<&str>) -> String {
        let now_ms = self.clock.epoch_ms();
        let mut sessions = self.sessions.lock();

        if let Some(id) = provided {
            if validate_session_id(id) {
                let entry = sessions.entry(id.to_string()).or_insert(SessionEntry {
                    agent: None,
                    created_at_ms: now_ms,
                    last_seen_ms: now_ms,
                });
                entry.last_seen_ms = now_ms;
                return id.to_string();
            }
        }

        let id = generate_session_id(&self.clock).to_string();
        sessions.insert(
            id.clone(),
            SessionEntry {
                agent: None,
                created_at_ms: now_ms,
                last_seen_ms: now_ms,
            },
        );
        id
    }

    /// Bind a session to an agent name (on join).
    pub fn bind(&self, session: &str, agent: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions.get_mut(session) {
            entry.agent = Some(agent.to_string());
        }
    }

    /// Drop any binding to `agent` (on leave or zombie eviction).
    pub fn unbind_agent(&self, agent: &str) {
        let mut sessions = self.sessions.lock();
        for entry in sessions.values_mut() {
            if entry.agent.as_deref() == Some(agent) {
                entry.agent = None;
            }
        }
    }

    pub fn agent_for(&self, session: &str) -> Option<String> {
        self.sessions.lock().get(session).and_then(|e| e.agent.clone())
    }

    /// Drop sessions idle longer than `idle`. Returns how many.
    pub fn prune(&self, idle: Duration) -> usize {
        let cutoff_ms = self.clock.epoch_ms().saturating_sub(idle.as_millis() as u64);
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, e| e.last_seen_ms >= cutoff_ms);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
