// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walph loop supervisor: one cooperative work loop per (room, agent).
//!
//! Each loop claims the next task, hands the payload to the injected
//! executor, records the outcome, and re-checks its state between
//! iterations. Pause parks the loop on a condvar inside the state
//! mutex; stop and resume broadcast it. The `running` flag is reset by
//! a drop guard on every exit path, including panics.

use crate::room::RoomEngine;
use masc_adapters::Executor;
use masc_core::{Clock, Error, Task};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Iteration cap applied when a preset does not set one.
pub const DEFAULT_MAX_ITERATIONS: u64 = 10;

/// Build the supervisor table key for `(room, agent)`.
///
/// `|` separates the two parts; a literal `|` in the agent name is
/// doubled so distinct names can never collide.
pub fn state_key(room: &str, agent: &str) -> Result<String, Error> {
    if agent.is_empty() {
        return Err(Error::Schema {
            detail: "agent name must not be empty".to_string(),
        });
    }
    Ok(format!("{room}|{}", agent.replace('|', "||")))
}

/// Snapshot of one loop's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalphStatus {
    pub agent: String,
    pub running: bool,
    pub paused: bool,
    pub stop_requested: bool,
    pub preset: String,
    pub iterations: u64,
    pub completed: u64,
}

#[derive(Default)]
struct WalphState {
    running: bool,
    paused: bool,
    stop_requested: bool,
    preset: String,
    iterations: u64,
    completed: u64,
    max_iterations: u64,
}

struct WalphEntry {
    agent: String,
    state: Mutex<WalphState>,
    cond: Condvar,
    join: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl WalphEntry {
    fn status(&self) -> WalphStatus {
        let state = self.state.lock();
        WalphStatus {
            agent: self.agent.clone(),
            running: state.running,
            paused: state.paused,
            stop_requested: state.stop_requested,
            preset: state.preset.clone(),
            iterations: state.iterations,
            completed: state.completed,
        }
    }
}

/// Resets `running` on every exit path out of the loop body.
struct RunningGuard {
    entry: Arc<WalphEntry>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = self.entry.state.lock();
        state.running = false;
        state.paused = false;
        state.stop_requested = false;
        self.entry.cond.notify_all();
    }
}

/// Supervisor owning every walph loop in one room.
pub struct WalphSupervisor<C: Clock> {
    engine: Arc<RoomEngine<C>>,
    executor: Arc<dyn Executor>,
    table: Mutex<HashMap<String, Arc<WalphEntry>>>,
    room_key: String,
    executor_deadline: Duration,
}

impl<C: Clock> WalphSupervisor<C> {
    pub fn new(engine: Arc<RoomEngine<C>>, executor: Arc<dyn Executor>) -> Self {
        let room_key = engine.base_path().display().to_string();
        let executor_deadline = Duration::from_secs(engine.config().default_deadline_secs);
        Self {
            engine,
            executor,
            table: Mutex::new(HashMap::new()),
            room_key,
            executor_deadline,
        }
    }

    fn entry(&self, agent: &str) -> Result<Option<Arc<WalphEntry>>, Error> {
        let key = state_key(&self.room_key, agent)?;
        Ok(self.table.lock().get(&key).cloned())
    }

    fn entry_or_insert(&self, agent: &str) -> Result<Arc<WalphEntry>, Error> {
        let key = state_key(&self.room_key, agent)?;
        let mut table = self.table.lock();
        Ok(Arc::clone(table.entry(key).or_insert_with(|| {
            Arc::new(WalphEntry {
                agent: agent.to_string(),
                state: Mutex::new(WalphState::default()),
                cond: Condvar::new(),
                join: Mutex::new(None),
            })
        })))
    }

    /// Start a loop for `agent`. Fails if one is already running.
    pub fn start(
        &self,
        agent: &str,
        preset: &str,
        max_iterations: Option<u64>,
    ) -> Result<WalphStatus, Error> {
        self.engine.room()?;
        self.engine.agent(agent)?;
        let entry = self.entry_or_insert(agent)?;

        {
            let mut state = entry.state.lock();
            if state.running {
                return Err(Error::WalphAlreadyRunning {
                    agent: agent.to_string(),
                });
            }
            *state = WalphState {
                running: true,
                paused: false,
                stop_requested: false,
                preset: preset.to_string(),
                iterations: 0,
                completed: 0,
                max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            };
        }

        let engine = Arc::clone(&self.engine);
        let executor = Arc::clone(&self.executor);
        let loop_entry = Arc::clone(&entry);
        let agent_name = agent.to_string();
        let deadline = self.executor_deadline;
        let handle = std::thread::spawn(move || {
            run_loop(engine, executor, loop_entry, &agent_name, deadline);
        });
        *entry.join.lock() = Some(handle);

        Ok(entry.status())
    }

    /// Request a clean stop at the next cooperative checkpoint.
    pub fn stop(&self, agent: &str) -> Result<WalphStatus, Error> {
        let entry = self.running_entry(agent)?;
        {
            let mut state = entry.state.lock();
            state.stop_requested = true;
        }
        entry.cond.notify_all();
        Ok(entry.status())
    }

    pub fn pause(&self, agent: &str) -> Result<WalphStatus, Error> {
        let entry = self.running_entry(agent)?;
        entry.state.lock().paused = true;
        Ok(entry.status())
    }

    pub fn resume(&self, agent: &str) -> Result<WalphStatus, Error> {
        let entry = self.running_entry(agent)?;
        entry.state.lock().paused = false;
        entry.cond.notify_all();
        Ok(entry.status())
    }

    /// Snapshot read; agents with no loop yet report all-false.
    pub fn status(&self, agent: &str) -> Result<WalphStatus, Error> {
        match self.entry(agent)? {
            Some(entry) => Ok(entry.status()),
            None => Ok(WalphStatus {
                agent: agent.to_string(),
                running: false,
                paused: false,
                stop_requested: false,
                preset: String::new(),
                iterations: 0,
                completed: 0,
            }),
        }
    }

    /// Remove an agent's state. Refused while the loop runs.
    pub fn remove(&self, agent: &str) -> Result<bool, Error> {
        let key = state_key(&self.room_key, agent)?;
        let mut table = self.table.lock();
        if let Some(entry) = table.get(&key) {
            if entry.state.lock().running {
                return Err(Error::WalphAlreadyRunning {
                    agent: agent.to_string(),
                });
            }
        }
        Ok(table.remove(&key).is_some())
    }

    // -- swarm operations over every loop in the room --

    pub fn swarm_status(&self) -> Vec<WalphStatus> {
        let mut statuses: Vec<WalphStatus> = self
            .table
            .lock()
            .values()
            .map(|entry| entry.status())
            .collect();
        statuses.sort_by(|a, b| a.agent.cmp(&b.agent));
        statuses
    }

    pub fn swarm_stop(&self) -> Vec<WalphStatus> {
        self.for_each_running(|entry| {
            entry.state.lock().stop_requested = true;
            entry.cond.notify_all();
        })
    }

    pub fn swarm_pause(&self) -> Vec<WalphStatus> {
        self.for_each_running(|entry| {
            entry.state.lock().paused = true;
        })
    }

    pub fn swarm_resume(&self) -> Vec<WalphStatus> {
        self.for_each_running(|entry| {
            entry.state.lock().paused = false;
            entry.cond.notify_all();
        })
    }

    /// Stop every loop and join the worker threads. Shutdown path.
    pub fn drain(&self) {
        self.swarm_stop();
        let entries: Vec<Arc<WalphEntry>> = self.table.lock().values().cloned().collect();
        for entry in entries {
            let handle = entry.join.lock().take();
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
    }

    /// Block until `agent`'s loop thread exits. Test and drain helper.
    pub fn join_agent(&self, agent: &str) -> Result<(), Error> {
        if let Some(entry) = self.entry(agent)? {
            let handle = entry.join.lock().take();
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
        Ok(())
    }

    fn running_entry(&self, agent: &str) -> Result<Arc<WalphEntry>, Error> {
        let entry = self.entry(agent)?.ok_or_else(|| Error::WalphNotRunning {
            agent: agent.to_string(),
        })?;
        if !entry.state.lock().running {
            return Err(Error::WalphNotRunning {
                agent: agent.to_string(),
            });
        }
        Ok(entry)
    }

    fn for_each_running(&self, apply: impl Fn(&WalphEntry)) -> Vec<WalphStatus> {
        let entries: Vec<Arc<WalphEntry>> = self.table.lock().values().cloned().collect();
        let mut statuses = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.state.lock().running {
                apply(&entry);
            }
            statuses.push(entry.status());
        }
        statuses.sort_by(|a, b| a.agent.cmp(&b.agent));
        statuses
    }
}

/// The loop body. Runs on a dedicated thread; every engine call is
/// ordinary blocking I/O.
fn run_loop<C: Clock>(
    engine: Arc<RoomEngine<C>>,
    executor: Arc<dyn Executor>,
    entry: Arc<WalphEntry>,
    agent: &str,
    deadline: Duration,
) {
    let _guard = RunningGuard {
        entry: Arc::clone(&entry),
    };

    loop {
        // Cooperative checkpoint: park while paused, honor stop, count
        // iterations against the preset cap.
        {
            let mut state = entry.state.lock();
            while state.paused && !state.stop_requested {
                entry.cond.wait(&mut state);
            }
            if state.stop_requested {
                tracing::debug!(agent, "walph stop observed");
                return;
            }
            if state.iterations >= state.max_iterations {
                let _ = engine.system_message(
                    format!("walph {agent}: iteration limit reached"),
                    None,
                );
                return;
            }
            state.iterations += 1;
        }

        let task = match engine.claim_next(agent, None) {
            Ok(task) => task,
            Err(Error::NoAvailableTasks) => {
                let _ = engine.broadcast(agent, "walph: backlog drained", None);
                return;
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(agent, error = %e, "walph claim retry");
                std::thread::sleep(Duration::from_millis(250));
                continue;
            }
            Err(e) => {
                let _ = engine.system_message(format!("walph {agent}: stopping: {e}"), None);
                return;
            }
        };

        run_task(&engine, executor.as_ref(), &entry, agent, &task, deadline);
    }
}

fn run_task<C: Clock>(
    engine: &RoomEngine<C>,
    executor: &dyn Executor,
    entry: &WalphEntry,
    agent: &str,
    task: &Task,
    deadline: Duration,
) {
    let prompt = if task.description.is_empty() {
        task.title.clone()
    } else {
        format!("{}\n\n{}", task.title, task.description)
    };

    match executor.run(&prompt, deadline) {
        Ok(output) => {
            let notes = output.excerpt(200);
            let notes = (!notes.is_empty()).then(|| notes.to_string());
            match engine.done(agent, &task.id, notes) {
                Ok(_) => {
                    entry.state.lock().completed += 1;
                    let _ = engine.broadcast(
                        agent,
                        &format!("walph: completed {}", task.id),
                        None,
                    );
                }
                Err(e) => {
                    tracing::warn!(agent, task = %task.id, error = %e, "walph done failed");
                }
            }
        }
        Err(e) => {
            // Give the task back so another agent can pick it up, then
            // keep looping.
            let _ = engine.broadcast(
                agent,
                &format!("walph: executor failed on {}: {e}", task.id),
                None,
            );
            if let Err(release_err) = engine.release(agent, &task.id) {
                tracing::warn!(agent, task = %task.id, error = %release_err, "walph release failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "walph_tests.rs"]
mod tests;
