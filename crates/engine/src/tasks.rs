// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task board operations and the claim compare-and-swap.
//!
//! Concurrent claims race on a short-lived backend lock at
//! `claims/<task_id>`: exactly one caller wins, re-checks `Todo` under
//! the guard, and writes the new status. Multi-key writes go task →
//! agent → message; the task record is the source of truth, so failures
//! after the task write are logged and corrected by the next read.

use crate::room::{keys, store_err, RoomEngine};
use masc_core::{Clock, Error, EventType, StreamEvent, Task, TaskId, TaskStatus};
use serde_json::json;

/// TTL on the claim guard; generous for a read-modify-write.
const CLAIM_GUARD_TTL_SECS: u64 = 10;

impl<C: Clock> RoomEngine<C> {
    pub fn task(&self, id: &TaskId) -> Result<Task, Error> {
        self.get_json::<Task>(&keys::task(id))?
            .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })
    }

    pub fn get_tasks(&self) -> Result<Vec<Task>, Error> {
        let mut tasks = Vec::new();
        for key in self.backend.list(keys::TASKS).map_err(store_err)? {
            if let Some(task) = self.get_json::<Task>(&key)? {
                tasks.push(task);
            }
        }
        tasks.sort_by_key(|t| t.id.index().unwrap_or(u64::MAX));
        Ok(tasks)
    }

    /// Create a task in `Todo`. Ids come from the board counter.
    pub fn add_task(
        &self,
        agent: &str,
        title: &str,
        description: &str,
        priority: u8,
        files: Vec<String>,
        required_caps: Vec<String>,
    ) -> Result<Task, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(agent)?;
        masc_core::validate_priority(priority)?;
        if title.is_empty() {
            return Err(Error::Schema {
                detail: "task title must not be empty".to_string(),
            });
        }

        let index = self
            .backend
            .atomic_inc(keys::TASK_SEQ, 1)
            .map_err(store_err)? as u64;
        let mut task = Task::new(
            TaskId::from_index(index),
            title,
            description,
            priority,
            self.clock.now_utc(),
        );
        task.files = files;
        task.required_caps = required_caps;

        self.put_json(&keys::task(&task.id), &task)?;
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Claim a specific Todo task. Exactly one concurrent caller wins.
    pub fn claim(&self, agent: &str, task_id: &TaskId) -> Result<Task, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(agent)?;

        let guard_key = keys::claim_guard(task_id);
        let acquired = self
            .backend
            .acquire_lock(&guard_key, CLAIM_GUARD_TTL_SECS, agent)
            .map_err(store_err)?;
        if !acquired {
            return Err(self.claimed_error(task_id));
        }

        let result = self.claim_under_guard(agent, task_id);
        if let Err(e) = self.backend.release_lock(&guard_key, agent) {
            tracing::warn!(task = %task_id, error = %e, "claim guard release failed");
        }
        result
    }

    fn claim_under_guard(&self, agent: &str, task_id: &TaskId) -> Result<Task, Error> {
        let mut task = self.task(task_id)?;
        match &task.status {
            TaskStatus::Todo => {}
            status => {
                return Err(match status.assignee() {
                    Some(by) => Error::TaskClaimed {
                        id: task_id.to_string(),
                        by: by.to_string(),
                    },
                    None => Error::InvalidTransition {
                        from: status.label().to_string(),
                        to: "claimed".to_string(),
                    },
                });
            }
        }

        task.status = TaskStatus::Claimed {
            assignee: agent.to_string(),
            claimed_at: self.clock.now_utc(),
        };
        self.put_json(&keys::task(task_id), &task)?;
        self.assign_current_task(agent, Some(task_id.clone()));
        let _ = self.system_message(format!("{agent} claimed {task_id}"), None);
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Claim the best matching Todo task: priority asc, then created_at,
    /// then board order. `capabilities` overrides the agent's advertised set.
    pub fn claim_next(
        &self,
        agent: &str,
        capabilities: Option<Vec<String>>,
    ) -> Result<Task, Error> {
        let record = self.require_active_agent(agent)?;
        let caps = capabilities.unwrap_or(record.capabilities);

        let mut candidates: Vec<Task> = self
            .get_tasks()?
            .into_iter()
            .filter(|t| matches!(t.status, TaskStatus::Todo))
            .filter(|t| t.required_caps.iter().all(|c| caps.contains(c)))
            .collect();
        candidates.sort_by(|a, b| {
            (a.priority, a.created_at, a.id.index())
                .cmp(&(b.priority, b.created_at, b.id.index()))
        });

        for candidate in candidates {
            match self.claim(agent, &candidate.id) {
                Ok(task) => return Ok(task),
                Err(Error::TaskClaimed { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoAvailableTasks)
    }

    /// Give a claimed/in-progress task back to the board.
    pub fn release(&self, agent: &str, task_id: &TaskId) -> Result<Task, Error> {
        self.require_active_agent(agent)?;
        let mut task = self.task(task_id)?;
        self.ensure_assigned_to(&task, agent)?;

        task.status = TaskStatus::Todo;
        self.put_json(&keys::task(task_id), &task)?;
        self.assign_current_task(agent, None);
        let _ = self.system_message(format!("{agent} released {task_id}"), None);
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Claimed → InProgress.
    pub fn start(&self, agent: &str, task_id: &TaskId) -> Result<Task, Error> {
        self.require_active_agent(agent)?;
        let mut task = self.task(task_id)?;
        self.ensure_assigned_to(&task, agent)?;
        if !matches!(task.status, TaskStatus::Claimed { .. }) {
            return Err(Error::InvalidTransition {
                from: task.status.label().to_string(),
                to: "in_progress".to_string(),
            });
        }

        task.status = TaskStatus::InProgress {
            assignee: agent.to_string(),
            started_at: self.clock.now_utc(),
        };
        self.put_json(&keys::task(task_id), &task)?;
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Complete an assigned task from Claimed or InProgress.
    pub fn done(
        &self,
        agent: &str,
        task_id: &TaskId,
        notes: Option<String>,
    ) -> Result<Task, Error> {
        self.require_active_agent(agent)?;
        let mut task = self.task(task_id)?;
        self.ensure_assigned_to(&task, agent)?;
        if !matches!(
            task.status,
            TaskStatus::Claimed { .. } | TaskStatus::InProgress { .. }
        ) {
            return Err(Error::InvalidTransition {
                from: task.status.label().to_string(),
                to: "done".to_string(),
            });
        }

        task.status = TaskStatus::Done {
            assignee: agent.to_string(),
            completed_at: self.clock.now_utc(),
            notes,
        };
        self.put_json(&keys::task(task_id), &task)?;
        self.assign_current_task(agent, None);
        let _ = self.system_message(format!("{agent} completed {task_id}"), None);
        self.fabric.notify(&StreamEvent::new(
            EventType::Completion,
            agent,
            json!({ "task_id": task.id.as_str(), "title": task.title }),
            self.clock.now_utc(),
        ));
        Ok(task)
    }

    /// Cancel from Todo/Claimed/InProgress. Terminal tasks stay put.
    pub fn cancel_task(
        &self,
        agent: &str,
        task_id: &TaskId,
        reason: Option<String>,
    ) -> Result<Task, Error> {
        self.require_active_agent(agent)?;
        let mut task = self.task(task_id)?;
        if task.status.is_terminal() {
            return Err(Error::InvalidTransition {
                from: task.status.label().to_string(),
                to: "cancelled".to_string(),
            });
        }

        let previous_assignee = task.status.assignee().map(|s| s.to_string());
        task.status = TaskStatus::Cancelled {
            cancelled_by: agent.to_string(),
            cancelled_at: self.clock.now_utc(),
            reason,
        };
        self.put_json(&keys::task(task_id), &task)?;
        if let Some(assignee) = previous_assignee {
            self.assign_current_task(&assignee, None);
        }
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Any active agent may re-prioritize a non-terminal task.
    pub fn update_priority(
        &self,
        agent: &str,
        task_id: &TaskId,
        priority: u8,
    ) -> Result<Task, Error> {
        self.require_active_agent(agent)?;
        masc_core::validate_priority(priority)?;
        let mut task = self.task(task_id)?;
        if task.status.is_terminal() {
            return Err(Error::InvalidTransition {
                from: task.status.label().to_string(),
                to: task.status.label().to_string(),
            });
        }
        task.priority = priority;
        self.put_json(&keys::task(task_id), &task)?;
        self.notify_task_update(&task);
        Ok(task)
    }

    /// Generic transition entry point used by the `transition` command.
    pub fn transition(&self, agent: &str, task_id: &TaskId, to: &str) -> Result<Task, Error> {
        match to {
            "claimed" => self.claim(agent, task_id),
            "in_progress" => self.start(agent, task_id),
            "todo" => self.release(agent, task_id),
            "done" => self.done(agent, task_id, None),
            "cancelled" => self.cancel_task(agent, task_id, None),
            other => {
                let from = self.task(task_id)?.status.label().to_string();
                Err(Error::InvalidTransition {
                    from,
                    to: other.to_string(),
                })
            }
        }
    }

    fn ensure_assigned_to(&self, task: &Task, agent: &str) -> Result<(), Error> {
        match task.status.assignee() {
            Some(by) if by == agent => Ok(()),
            Some(by) => Err(Error::TaskNotAssignedToYou {
                id: task.id.to_string(),
                by: by.to_string(),
            }),
            None => Err(Error::InvalidTransition {
                from: task.status.label().to_string(),
                to: "assigned".to_string(),
            }),
        }
    }

    /// Best-effort update of `agent.current_task`; the task record wins
    /// on any divergence.
    fn assign_current_task(&self, agent: &str, task_id: Option<TaskId>) {
        let key = keys::agent(agent);
        match self.get_json::<masc_core::AgentRecord>(&key) {
            Ok(Some(mut record)) => {
                record.current_task = task_id;
                record.last_seen = self.clock.now_utc();
                if let Err(e) = self.put_json(&key, &record) {
                    tracing::warn!(agent, error = %e, "current_task update failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(agent, error = %e, "current_task read failed"),
        }
    }

    /// Report who holds a task another caller just lost the race for.
    fn claimed_error(&self, task_id: &TaskId) -> Error {
        for _ in 0..3 {
            match self.get_json::<Task>(&keys::task(task_id)) {
                Ok(Some(task)) => {
                    if let Some(by) = task.status.assignee() {
                        return Error::TaskClaimed {
                            id: task_id.to_string(),
                            by: by.to_string(),
                        };
                    }
                }
                Ok(None) => {
                    return Error::TaskNotFound {
                        id: task_id.to_string(),
                    }
                }
                Err(e) => return e,
            }
            // Winner is mid-write; give it a beat
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        Error::TaskClaimed {
            id: task_id.to_string(),
            by: "another agent".to_string(),
        }
    }

    pub(crate) fn notify_task_update(&self, task: &Task) {
        let agent = task.status.assignee().unwrap_or("").to_string();
        self.fabric.notify(&StreamEvent::new(
            EventType::TaskUpdate,
            agent,
            json!({
                "task_id": task.id.as_str(),
                "title": task.title,
                "state": task.status.label(),
                "priority": task.priority,
            }),
            self.clock.now_utc(),
        ));
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
