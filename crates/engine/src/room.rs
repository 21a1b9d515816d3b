// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The room engine: authoritative mutations over the coordination model.
//!
//! One engine per room. All writes funnel through the storage backend;
//! every state transition notifies the streaming fabric. Commands are
//! synchronous — callers on an async runtime go through their worker
//! pool.

use crate::fabric::EventFabric;
use crate::walph::WalphStatus;
use chrono::{DateTime, TimeZone, Utc};
use masc_core::{
    validate_agent_name, AgentMeta, AgentRecord, AgentStatus, AuditEvent, AuditRecord, Clock,
    Error, Room, RoomConfig, Task, TaskStatus,
};
use masc_storage::{AuditSink, StorageBackend, StorageError};
use parking_lot::{Condvar, Mutex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage key layout. The engine is the only author of keys.
pub(crate) mod keys {
    use masc_core::{TaskId, VoteId};

    pub const STATE: &str = "state";
    pub const MESSAGE_SEQ: &str = "room.message_seq";
    pub const TASK_SEQ: &str = "room.task_seq";
    pub const VOTE_SEQ: &str = "room.vote_seq";

    pub const AGENTS: &str = "agents/";
    pub const TASKS: &str = "tasks/";
    pub const MESSAGES: &str = "messages/";
    pub const LOCKS: &str = "locks/";
    pub const VOTES: &str = "votes/";
    pub const PORTALS: &str = "portals/";
    pub const CLAIMS: &str = "claims/";

    pub fn agent(name: &str) -> String {
        format!("{AGENTS}{name}")
    }

    pub fn task(id: &TaskId) -> String {
        format!("{TASKS}{id}")
    }

    /// Zero-padded so lexicographic listing equals numeric seq order.
    pub fn message(seq: u64) -> String {
        format!("{MESSAGES}{seq:020}")
    }

    pub fn message_seq(key: &str) -> Option<u64> {
        key.strip_prefix(MESSAGES)?.parse().ok()
    }

    pub fn lock(escaped_resource: &str) -> String {
        format!("{LOCKS}{escaped_resource}")
    }

    pub fn vote(id: &VoteId) -> String {
        format!("{VOTES}{id}")
    }

    pub fn portal(owner: &str) -> String {
        format!("{PORTALS}{owner}")
    }

    /// Short-lived guard key used as the claim compare-and-swap.
    pub fn claim_guard(id: &TaskId) -> String {
        format!("{CLAIMS}{id}")
    }
}

/// Wakeup signal for portal waiters.
pub(crate) struct PortalSignal {
    pub(crate) mutex: Mutex<()>,
    pub(crate) cond: Condvar,
}

/// Authoritative state engine for one room.
pub struct RoomEngine<C: Clock> {
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) fabric: Arc<EventFabric>,
    pub(crate) clock: C,
    base_path: PathBuf,
    config: RoomConfig,
    pub(crate) portal_signal: PortalSignal,
}

/// Map storage failures onto the domain taxonomy.
pub(crate) fn store_err(e: StorageError) -> Error {
    if e.is_retryable() {
        Error::Io {
            detail: e.to_string(),
        }
    } else {
        Error::Backend {
            detail: e.to_string(),
        }
    }
}

pub(crate) fn ms_to_utc(ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .unwrap_or_default()
}

impl<C: Clock> RoomEngine<C> {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        audit: Arc<dyn AuditSink>,
        fabric: Arc<EventFabric>,
        clock: C,
        base_path: impl Into<PathBuf>,
        config: RoomConfig,
    ) -> Self {
        Self {
            backend,
            audit,
            fabric,
            clock,
            base_path: base_path.into(),
            config,
            portal_signal: PortalSignal {
                mutex: Mutex::new(()),
                cond: Condvar::new(),
            },
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn fabric(&self) -> &Arc<EventFabric> {
        &self.fabric
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---------------------------------------------------------------
    // storage helpers
    // ---------------------------------------------------------------

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.backend.get(key).map_err(store_err)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| Error::Backend {
                    detail: format!("corrupt record at {key}: {e}"),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::Internal {
            detail: e.to_string(),
        })?;
        self.backend.put(key, &bytes).map_err(store_err)
    }

    pub(crate) fn audit(&self, event: AuditEvent) {
        let record = AuditRecord {
            at: self.clock.now_utc(),
            event,
        };
        if let Err(e) = self.audit.append(&record) {
            tracing::warn!(error = %e, "audit append failed");
        }
    }

    // ---------------------------------------------------------------
    // room lifecycle
    // ---------------------------------------------------------------

    /// Load the room record, or `NotInitialized`.
    pub fn room(&self) -> Result<Room, Error> {
        self.get_json::<Room>(keys::STATE)?
            .ok_or(Error::NotInitialized)
    }

    pub(crate) fn save_room(&self, room: &Room) -> Result<(), Error> {
        self.put_json(keys::STATE, room)
    }

    /// Create the room if it does not exist yet; idempotent.
    pub fn init(&self, project_name: Option<String>) -> Result<Room, Error> {
        if let Some(existing) = self.get_json::<Room>(keys::STATE)? {
            return Ok(existing);
        }
        let name = project_name
            .unwrap_or_else(|| self.config.project_name_or(&self.base_path));
        let room = Room::new(name.clone(), self.clock.now_utc());
        self.save_room(&room)?;
        self.audit(AuditEvent::RoomInitialized { project_name: name });
        Ok(room)
    }

    /// Drop every record. Counters are preserved, so seqs and task ids
    /// keep increasing across a reset.
    pub fn reset(&self) -> Result<(), Error> {
        for prefix in [
            keys::AGENTS,
            keys::TASKS,
            keys::MESSAGES,
            keys::LOCKS,
            keys::VOTES,
            keys::PORTALS,
            keys::CLAIMS,
        ] {
            for key in self.backend.list(prefix).map_err(store_err)? {
                self.backend.delete(&key).map_err(store_err)?;
            }
        }
        self.backend.delete(keys::STATE).map_err(store_err)?;
        self.audit(AuditEvent::RoomReset);
        Ok(())
    }

    /// Reject mutating commands while the room is paused.
    pub(crate) fn ensure_unpaused(&self, room: &Room) -> Result<(), Error> {
        if room.paused {
            return Err(Error::RoomPaused {
                reason: room.pause_reason.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub fn pause(&self, by: &str, reason: &str) -> Result<(), Error> {
        let mut room = self.room()?;
        self.require_active_agent(by)?;
        room.pause(by, reason, self.clock.now_utc());
        self.save_room(&room)?;
        self.audit(AuditEvent::RoomPaused {
            by: by.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    pub fn resume_room(&self, by: &str) -> Result<(), Error> {
        let mut room = self.room()?;
        self.require_active_agent(by)?;
        room.resume();
        self.save_room(&room)?;
        self.audit(AuditEvent::RoomResumed { by: by.to_string() });
        Ok(())
    }

    // ---------------------------------------------------------------
    // agents
    // ---------------------------------------------------------------

    pub fn agent(&self, name: &str) -> Result<AgentRecord, Error> {
        self.get_json::<AgentRecord>(&keys::agent(name))?
            .ok_or_else(|| Error::AgentNotFound {
                name: name.to_string(),
            })
    }

    /// Resolve an agent that is allowed to issue commands.
    pub(crate) fn require_active_agent(&self, name: &str) -> Result<AgentRecord, Error> {
        let record = self.agent(name)?;
        if !record.is_active() {
            return Err(Error::Forbidden {
                agent: name.to_string(),
                action: "act while inactive".to_string(),
            });
        }
        Ok(record)
    }

    /// Register an agent, or reactivate an inactive record of the same name.
    pub fn join(
        &self,
        name: &str,
        capabilities: Vec<String>,
        meta: AgentMeta,
    ) -> Result<AgentRecord, Error> {
        validate_agent_name(name)?;
        let mut room = self.room()?;
        self.ensure_unpaused(&room)?;

        if let Some(existing) = self.get_json::<AgentRecord>(&keys::agent(name))? {
            if existing.is_active() {
                return Err(Error::AgentAlreadyExists {
                    name: name.to_string(),
                });
            }
        }

        let mut record = AgentRecord::new(name, capabilities, self.clock.now_utc());
        record.meta = meta;
        self.put_json(&keys::agent(name), &record)?;

        room.active_agents.insert(name.to_string());
        self.save_room(&room)?;
        self.audit(AuditEvent::AgentJoined {
            name: name.to_string(),
        });
        Ok(record)
    }

    /// Graceful exit: same cleanup as a zombie eviction, different reason.
    pub fn leave(&self, name: &str) -> Result<(), Error> {
        self.agent(name)?;
        self.deactivate_agent(name, "leave")
    }

    /// Update `last_seen`; the gate calls this on every command.
    pub fn touch(&self, name: &str) -> Result<(), Error> {
        let key = keys::agent(name);
        if let Some(mut record) = self.get_json::<AgentRecord>(&key)? {
            record.last_seen = self.clock.now_utc();
            self.put_json(&key, &record)?;
        }
        Ok(())
    }

    /// Explicit liveness signal; also lets an agent adjust its status.
    pub fn heartbeat(&self, name: &str, status: Option<AgentStatus>) -> Result<(), Error> {
        let key = keys::agent(name);
        let mut record = self.require_active_agent(name)?;
        record.last_seen = self.clock.now_utc();
        if let Some(status) = status {
            if status != AgentStatus::Inactive {
                record.status = status;
            }
        }
        self.put_json(&key, &record)
    }

    pub fn get_agents(&self) -> Result<Vec<AgentRecord>, Error> {
        let mut agents = Vec::new();
        for key in self.backend.list(keys::AGENTS).map_err(store_err)? {
            if let Some(record) = self.get_json::<AgentRecord>(&key)? {
                agents.push(record);
            }
        }
        Ok(agents)
    }

    /// Release everything an agent holds and mark it inactive. Shared by
    /// `leave` and the zombie sweeper; the record is kept for history.
    pub(crate) fn deactivate_agent(&self, name: &str, reason: &str) -> Result<(), Error> {
        self.release_locks_owned_by(name, reason)?;
        self.revert_tasks_assigned_to(name)?;

        let key = keys::agent(name);
        if let Some(mut record) = self.get_json::<AgentRecord>(&key)? {
            record.status = AgentStatus::Inactive;
            record.current_task = None;
            self.put_json(&key, &record)?;
        }

        if let Ok(mut room) = self.room() {
            room.active_agents.remove(name);
            self.save_room(&room)?;
        }

        self.audit(AuditEvent::AgentLeft {
            name: name.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Revert any Claimed/InProgress task assigned to `name` back to Todo.
    fn revert_tasks_assigned_to(&self, name: &str) -> Result<(), Error> {
        for key in self.backend.list(keys::TASKS).map_err(store_err)? {
            let Some(mut task) = self.get_json::<Task>(&key)? else {
                continue;
            };
            if task.status.assignee() != Some(name) || task.status.is_terminal() {
                continue;
            }
            task.status = TaskStatus::Todo;
            self.put_json(&key, &task)?;
            self.audit(AuditEvent::TaskReverted {
                task_id: task.id.to_string(),
                from_agent: name.to_string(),
            });
            let _ = self.system_message(
                format!("task {} reverted to todo ({name} gone)", task.id),
                None,
            );
            self.notify_task_update(&task);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // status summary
    // ---------------------------------------------------------------

    pub fn get_status(&self) -> Result<StatusSummary, Error> {
        let room = self.room()?;
        let mut counts = TaskCounts::default();
        for task in self.get_tasks()? {
            match task.status {
                TaskStatus::Todo => counts.todo += 1,
                TaskStatus::Claimed { .. } => counts.claimed += 1,
                TaskStatus::InProgress { .. } => counts.in_progress += 1,
                TaskStatus::Done { .. } => counts.done += 1,
                TaskStatus::Cancelled { .. } => counts.cancelled += 1,
            }
        }
        let open_votes = self
            .votes_status()?
            .iter()
            .filter(|v| v.state == masc_core::VoteState::Open)
            .count();
        let held_locks = self.list_locks()?.len();

        let uptime_secs = self
            .clock
            .now_utc()
            .signed_duration_since(room.started_at)
            .num_seconds()
            .max(0) as u64;

        Ok(StatusSummary {
            project_name: room.project_name,
            protocol_version: room.protocol_version,
            started_at: room.started_at,
            uptime_secs,
            paused: room.paused,
            pause_reason: room.pause_reason,
            active_agents: room.active_agents.into_iter().collect(),
            task_counts: counts,
            open_votes,
            held_locks,
            message_seq: room.message_seq,
            swarm: Vec::new(),
        })
    }
}

/// Per-state task tallies for the status summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub todo: usize,
    pub claimed: usize,
    pub in_progress: usize,
    pub done: usize,
    pub cancelled: usize,
}

/// Room overview returned by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub project_name: String,
    pub protocol_version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    pub active_agents: Vec<String>,
    pub task_counts: TaskCounts,
    pub open_votes: usize,
    pub held_locks: usize,
    pub message_seq: u64,
    /// Walph loop snapshot, one entry per agent. The engine has no
    /// handle on the supervisor; the gate fills this in before the
    /// summary goes out.
    #[serde(default)]
    pub swarm: Vec<WalphStatus>,
}

#[cfg(test)]
#[path = "room_tests.rs"]
mod tests;
