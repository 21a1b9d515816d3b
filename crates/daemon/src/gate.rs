// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session & auth gate: the single dispatch path into the room.
//!
//! Order per command: resolve session → authorize → rate limit →
//! idempotency replay → execute (with bounded retries on transient
//! storage failures) → cache/fan-out. Errors surface verbatim as typed
//! responses; an `error` stream event mirrors each failure to
//! subscribers.

use crate::auth::{required_permission, AuthStore};
use crate::idempotency::IdempotencyCache;
use crate::protocol::{Command, Reply, Request, Response, PROTOCOL_VERSION};
use crate::rate_limit::RateLimiter;
use crate::sessions::SessionTable;
use masc_core::{Clock, Error, EventType, StreamEvent, TaskId, TokenStore, VoteId};
use masc_engine::{RoomEngine, Shutdown, WalphSupervisor};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Transient storage failures are retried this many times before the
/// error surfaces to the caller.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(25);

pub struct Gate<C: Clock> {
    engine: Arc<RoomEngine<C>>,
    walph: Arc<WalphSupervisor<C>>,
    sessions: SessionTable<C>,
    auth: AuthStore,
    limiter: RateLimiter<C>,
    idempotency: IdempotencyCache<C>,
    cancel_tokens: Arc<TokenStore>,
    shutdown: Arc<Shutdown>,
    clock: C,
}

impl<C: Clock> Gate<C> {
    pub fn new(
        engine: Arc<RoomEngine<C>>,
        walph: Arc<WalphSupervisor<C>>,
        auth: AuthStore,
        cancel_tokens: Arc<TokenStore>,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        let clock = engine.clock().clone();
        let config = engine.config().clone();
        Self {
            sessions: SessionTable::new(clock.clone()),
            limiter: RateLimiter::new(config.rate, config.burst, clock.clone()),
            idempotency: IdempotencyCache::new(
                Duration::from_secs(config.idempotency_window_secs),
                clock.clone(),
            ),
            engine,
            walph,
            auth,
            cancel_tokens,
            shutdown,
            clock,
        }
    }

    pub fn engine(&self) -> &Arc<RoomEngine<C>> {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionTable<C> {
        &self.sessions
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Process one request end to end. Never panics outward: handler
    /// panics become `internal_error` responses.
    pub fn dispatch(&self, request: Request) -> Reply {
        let session = self.sessions.ensure(request.session.as_deref());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.dispatch_checked(&session, &request)
        }));
        let response = match outcome {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(?request.command, "command handler panicked");
                Response::from_error(&Error::Internal {
                    detail: "command handler panicked".to_string(),
                })
            }
        };

        Reply { session, response }
    }

    fn dispatch_checked(&self, session: &str, request: &Request) -> Response {
        match self.authorize_and_execute(session, request) {
            Ok(response) => response,
            Err(e) => {
                self.fan_out_error(request, &e);
                Response::from_error(&e)
            }
        }
    }

    fn authorize_and_execute(
        &self,
        session: &str,
        request: &Request,
    ) -> Result<Response, Error> {
        let command = &request.command;
        let caller = command_agent(command)
            .map(str::to_string)
            .or_else(|| self.sessions.agent_for(session));

        // Authorization. AuthCreateToken authenticates through the room
        // secret it carries, not through a caller role; the first
        // AuthEnable is the bootstrap and needs no credential either.
        let skip_role_check = matches!(command, Command::AuthCreateToken { .. })
            || (matches!(command, Command::AuthEnable) && !self.auth.has_secret());
        if !skip_role_check {
            if let Some(permission) = required_permission(command) {
                let auth_subject = caller.as_deref().unwrap_or(session);
                let role =
                    self.auth
                        .verify(auth_subject, request.token.as_deref(), self.clock.epoch_ms())?;
                if !role.allows(permission) {
                    return Err(Error::Forbidden {
                        agent: auth_subject.to_string(),
                        action: format!("{permission:?}"),
                    });
                }
            }
        }

        // Rate limiting keys on the agent when known, else the session.
        let limit_key = caller.clone().unwrap_or_else(|| session.to_string());
        if let Err(retry_after_secs) = self.limiter.check(&limit_key) {
            return Err(Error::RateLimited { retry_after_secs });
        }

        // Idempotent replay for create commands.
        let replay_key = request.idempotency_key.as_deref().filter(|_| {
            matches!(
                command,
                Command::AddTask { .. } | Command::VoteCreate { .. } | Command::PortalOpen { .. }
            )
        });
        if let Some(key) = replay_key {
            if let Some(cached) = self.idempotency.get(key) {
                return Ok(cached);
            }
        }

        // Every command counts as liveness for its agent.
        if let Some(agent) = &caller {
            if let Err(e) = self.engine.touch(agent) {
                tracing::warn!(agent, error = %e, "last_seen update failed");
            }
        }

        let response = self.execute_with_retry(session, command)?;

        if let Some(key) = replay_key {
            self.idempotency.put(key, response.clone());
        }
        Ok(response)
    }

    fn execute_with_retry(&self, session: &str, command: &Command) -> Result<Response, Error> {
        let mut attempt = 0;
        loop {
            match self.execute(session, command) {
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "retrying transient failure");
                    std::thread::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1));
                }
                other => return other,
            }
        }
    }

    fn execute(&self, session: &str, command: &Command) -> Result<Response, Error> {
        match command {
            Command::Ping => Ok(Response::Pong),
            Command::Hello { version: _ } => Ok(Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }),

            Command::Init { project_name } => {
                let room = self.engine.init(project_name.clone())?;
                Ok(Response::Room { room })
            }
            Command::Reset => {
                self.engine.reset()?;
                Ok(Response::Ok)
            }
            Command::Status => {
                let mut status = self.engine.get_status()?;
                status.swarm = self.walph.swarm_status();
                Ok(Response::Status { status })
            }
            Command::Pause { agent, reason } => {
                self.engine.pause(agent, reason)?;
                Ok(Response::Ok)
            }
            Command::Resume { agent } => {
                self.engine.resume_room(agent)?;
                Ok(Response::Ok)
            }

            Command::Join {
                agent,
                capabilities,
                meta,
            } => {
                let record = self.engine.join(agent, capabilities.clone(), meta.clone())?;
                self.sessions.bind(session, agent);
                Ok(Response::Agent { agent: record })
            }
            Command::Leave { agent } => {
                self.engine.leave(agent)?;
                self.sessions.unbind_agent(agent);
                Ok(Response::Ok)
            }
            Command::Heartbeat { agent, status } => {
                self.engine.heartbeat(agent, *status)?;
                Ok(Response::Ok)
            }
            Command::Agents => Ok(Response::Agents {
                agents: self.engine.get_agents()?,
            }),

            Command::Tasks => Ok(Response::Tasks {
                tasks: self.engine.get_tasks()?,
            }),
            Command::AddTask {
                agent,
                title,
                description,
                priority,
                files,
                required_caps,
            } => {
                let task = self.engine.add_task(
                    agent,
                    title,
                    description,
                    *priority,
                    files.clone(),
                    required_caps.clone(),
                )?;
                Ok(Response::Task { task })
            }
            Command::Claim { agent, task_id } => {
                let task = self.engine.claim(agent, &TaskId::new(task_id))?;
                Ok(Response::Task { task })
            }
            Command::ClaimNext {
                agent,
                capabilities,
            } => {
                let task = self.engine.claim_next(agent, capabilities.clone())?;
                Ok(Response::Task { task })
            }
            Command::Release { agent, task_id } => {
                let task = self.engine.release(agent, &TaskId::new(task_id))?;
                Ok(Response::Task { task })
            }
            Command::Done {
                agent,
                task_id,
                notes,
            } => {
                let task = self
                    .engine
                    .done(agent, &TaskId::new(task_id), notes.clone())?;
                Ok(Response::Task { task })
            }
            Command::CancelTask {
                agent,
                task_id,
                reason,
            } => {
                let task =
                    self.engine
                        .cancel_task(agent, &TaskId::new(task_id), reason.clone())?;
                Ok(Response::Task { task })
            }
            Command::Transition {
                agent,
                task_id,
                to,
            } => {
                let task = self.engine.transition(agent, &TaskId::new(task_id), to)?;
                Ok(Response::Task { task })
            }
            Command::UpdatePriority {
                agent,
                task_id,
                priority,
            } => {
                let task =
                    self.engine
                        .update_priority(agent, &TaskId::new(task_id), *priority)?;
                Ok(Response::Task { task })
            }

            Command::Broadcast {
                agent,
                content,
                mention,
            } => {
                let seq = self.engine.broadcast(agent, content, mention.clone())?;
                Ok(Response::Seq { seq })
            }
            Command::Listen {
                since_seq,
                cursor,
                limit,
            } => {
                let limit = limit.unwrap_or(100);
                let page = match cursor {
                    Some(cursor) => self.engine.get_messages_after(cursor, limit)?,
                    None => self.engine.get_messages(since_seq.unwrap_or(0), limit)?,
                };
                Ok(Response::Messages {
                    messages: page.messages,
                    next_cursor: page.next_cursor,
                })
            }

            Command::Lock {
                agent,
                resource,
                ttl_secs,
            } => {
                let lock = self
                    .engine
                    .lock(agent, resource, ttl_secs.unwrap_or(300))?;
                Ok(Response::Lock { lock })
            }
            Command::Unlock { agent, resource } => {
                self.engine.unlock(agent, resource)?;
                Ok(Response::Ok)
            }
            Command::Locks => Ok(Response::Locks {
                locks: self.engine.list_locks()?,
            }),

            Command::PortalOpen { agent, peer } => {
                let portal = self.engine.portal_open(agent, peer)?;
                Ok(Response::Portal {
                    portal: Some(Box::new(portal)),
                })
            }
            Command::PortalSend {
                agent,
                content,
                timeout_secs,
            } => {
                let timeout = Duration::from_secs(
                    timeout_secs.unwrap_or(self.engine.config().default_deadline_secs),
                );
                // Registered so shutdown (or the token GC) can abort the wait.
                let token = self.cancel_tokens.create(
                    format!("portal-send:{agent}:{}", self.clock.epoch_ms()),
                    self.clock.epoch_ms(),
                );
                let result = self.engine.portal_send(agent, content, timeout, Some(&token));
                self.cancel_tokens.remove(token.id());
                result?;
                Ok(Response::Ok)
            }
            Command::PortalClose { agent } => {
                self.engine.portal_close(agent)?;
                Ok(Response::Ok)
            }
            Command::PortalStatus { agent } => Ok(Response::Portal {
                portal: self.engine.portal_status(agent)?.map(Box::new),
            }),

            Command::VoteCreate {
                agent,
                topic,
                options,
                required_votes,
            } => {
                let vote =
                    self.engine
                        .vote_create(agent, topic, options.clone(), *required_votes)?;
                Ok(Response::Vote {
                    vote: Box::new(vote),
                })
            }
            Command::VoteCast {
                agent,
                vote_id,
                option,
            } => {
                let vote = self
                    .engine
                    .vote_cast(agent, &VoteId::new(vote_id), option)?;
                Ok(Response::Vote {
                    vote: Box::new(vote),
                })
            }
            Command::VoteClose { agent, vote_id } => {
                let vote = self.engine.vote_close(agent, &VoteId::new(vote_id))?;
                Ok(Response::Vote {
                    vote: Box::new(vote),
                })
            }
            Command::VoteStatus => Ok(Response::Votes {
                votes: self.engine.votes_status()?,
            }),

            Command::Subscribe {
                agent_filter,
                event_types,
            } => {
                let types: BTreeSet<EventType> = event_types.iter().copied().collect();
                let id = self.engine.fabric().subscribe(
                    agent_filter.clone(),
                    types,
                    self.clock.epoch_ms(),
                );
                Ok(Response::Subscribed {
                    subscription_id: id.to_string(),
                })
            }
            Command::Unsubscribe { subscription_id } => {
                let removed = self
                    .engine
                    .fabric()
                    .unsubscribe(&subscription_id.as_str().into());
                Ok(Response::Unsubscribed { removed })
            }
            Command::PollEvents {
                subscription_id,
                clear,
            } => {
                let events = self
                    .engine
                    .fabric()
                    .poll_events(&subscription_id.as_str().into(), *clear)?;
                Ok(Response::Events { events })
            }

            Command::WalphStart {
                agent,
                preset,
                max_iterations,
            } => Ok(Response::Walph {
                status: self.walph.start(agent, preset, *max_iterations)?,
            }),
            Command::WalphStop { agent } => Ok(Response::Walph {
                status: self.walph.stop(agent)?,
            }),
            Command::WalphPause { agent } => Ok(Response::Walph {
                status: self.walph.pause(agent)?,
            }),
            Command::WalphResume { agent } => Ok(Response::Walph {
                status: self.walph.resume(agent)?,
            }),
            Command::WalphStatus { agent } => Ok(Response::Walph {
                status: self.walph.status(agent)?,
            }),
            Command::WalphRemove { agent } => Ok(Response::Removed {
                removed: self.walph.remove(agent)?,
            }),

            Command::SwarmStatus => Ok(Response::Swarm {
                statuses: self.walph.swarm_status(),
            }),
            Command::SwarmStop => Ok(Response::Swarm {
                statuses: self.walph.swarm_stop(),
            }),
            Command::SwarmPause => Ok(Response::Swarm {
                statuses: self.walph.swarm_pause(),
            }),
            Command::SwarmResume => Ok(Response::Swarm {
                statuses: self.walph.swarm_resume(),
            }),

            Command::AuthEnable => {
                let secret = self.auth.enable()?;
                self.engine
                    .fabric()
                    .notify(&StreamEvent::new(
                        EventType::Broadcast,
                        "room",
                        json!({ "content": "auth enabled" }),
                        self.clock.now_utc(),
                    ));
                Ok(Response::Secret { secret })
            }
            Command::AuthCreateToken {
                agent,
                role,
                secret,
            } => {
                let token =
                    self.auth
                        .create_token(secret, agent, *role, self.clock.epoch_ms())?;
                Ok(Response::Token {
                    agent: agent.clone(),
                    token,
                })
            }

            Command::Shutdown => {
                self.shutdown.trigger();
                Ok(Response::ShuttingDown)
            }
        }
    }

    /// Drop idle rate-limit buckets, idle sessions, and expired auth
    /// tokens. Driven by the daemon's housekeeping loop.
    pub fn prune_transients(&self, idle: Duration) {
        let buckets = self.limiter.prune(idle);
        let sessions = self.sessions.prune(idle);
        let tokens = self.auth.sweep_expired(&self.clock).unwrap_or(0);
        if buckets + sessions + tokens > 0 {
            tracing::debug!(buckets, sessions, tokens, "pruned transient state");
        }
    }

    /// Mirror a command failure onto the event stream.
    fn fan_out_error(&self, request: &Request, error: &Error) {
        let agent = command_agent(&request.command).unwrap_or("").to_string();
        self.engine.fabric().notify(&StreamEvent::new(
            EventType::Error,
            agent,
            json!({ "kind": error.kind(), "message": error.to_string() }),
            self.clock.now_utc(),
        ));
    }
}

/// The agent a command claims to act as, when it names one.
fn command_agent(command: &Command) -> Option<&str> {
    match command {
        Command::Pause { agent, .. }
        | Command::Resume { agent }
        | Command::Join { agent, .. }
        | Command::Leave { agent }
        | Command::Heartbeat { agent, .. }
        | Command::AddTask { agent, .. }
        | Command::Claim { agent, .. }
        | Command::ClaimNext { agent, .. }
        | Command::Release { agent, .. }
        | Command::Done { agent, .. }
        | Command::CancelTask { agent, .. }
        | Command::Transition { agent, .. }
        | Command::UpdatePriority { agent, .. }
        | Command::Broadcast { agent, .. }
        | Command::Lock { agent, .. }
        | Command::Unlock { agent, .. }
        | Command::PortalOpen { agent, .. }
        | Command::PortalSend { agent, .. }
        | Command::PortalClose { agent }
        | Command::PortalStatus { agent }
        | Command::VoteCreate { agent, .. }
        | Command::VoteCast { agent, .. }
        | Command::VoteClose { agent, .. }
        | Command::WalphStart { agent, .. }
        | Command::WalphStop { agent }
        | Command::WalphPause { agent }
        | Command::WalphResume { agent }
        | Command::WalphStatus { agent }
        | Command::WalphRemove { agent } => Some(agent),
        _ => None,
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
