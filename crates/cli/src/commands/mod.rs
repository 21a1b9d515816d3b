// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument parsing and command construction.

mod comms;
mod room;
mod tasks;
mod walph;

use crate::client;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use masc_core::EventType;
use masc_daemon::protocol::{Command, Reply, Request, Response};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "masc", version, about = "Multi-agent room coordination")]
pub struct Cli {
    /// Room base path (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    pub room: PathBuf,

    /// Session id to echo back to the daemon
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Auth token, when the room has auth enabled
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Print the raw JSON reply instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: TopCommand,
}

#[derive(Debug, Subcommand)]
pub enum TopCommand {
    /// Initialize the room
    Init {
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Wipe all room records
    Reset,
    /// Room status summary
    Status,
    /// Pause the room (mutations rejected)
    Pause { agent: String, reason: String },
    /// Resume a paused room
    Resume { agent: String },
    /// Register an agent
    Join {
        agent: String,
        /// Comma-separated capability tags
        #[arg(long, value_delimiter = ',')]
        capabilities: Vec<String>,
    },
    /// Deregister an agent, releasing its claims and locks
    Leave { agent: String },
    /// Liveness ping for an agent
    Heartbeat { agent: String },
    /// List agents
    Agents,

    /// Task board operations
    #[command(subcommand)]
    Task(tasks::TaskCommand),

    /// Send a broadcast message
    Broadcast {
        agent: String,
        content: String,
        #[arg(long)]
        mention: Option<String>,
    },
    /// Read messages from the ordered log
    Listen {
        #[arg(long, default_value_t = 0)]
        since: u64,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Acquire an advisory file lock
    Lock {
        agent: String,
        resource: String,
        #[arg(long, default_value_t = 300)]
        ttl: u64,
    },
    /// Release an advisory file lock
    Unlock { agent: String, resource: String },
    /// List live locks
    Locks,

    /// Portal (point-to-point) operations
    #[command(subcommand)]
    Portal(comms::PortalCommand),

    /// Vote operations
    #[command(subcommand)]
    Vote(comms::VoteCommand),

    /// Subscribe to the event stream
    Subscribe {
        /// Agent filter; omit or "*" for any
        #[arg(long)]
        agent_filter: Option<String>,
        /// Event types (task_update, broadcast, completion, error); empty = all
        #[arg(long, value_delimiter = ',')]
        events: Vec<String>,
    },
    /// Drop a subscription
    Unsubscribe { subscription_id: String },
    /// Poll buffered events
    Poll {
        subscription_id: String,
        /// Keep the buffer instead of clearing it
        #[arg(long)]
        keep: bool,
    },

    /// Walph loop operations
    #[command(subcommand)]
    Walph(walph::WalphCommand),

    /// Swarm operations over every walph loop
    #[command(subcommand)]
    Swarm(walph::SwarmCommand),

    /// Auth administration
    #[command(subcommand)]
    Auth(room::AuthCommand),

    /// Ask the daemon to shut down
    Shutdown,
}

pub(crate) fn parse_event_type(s: &str) -> Result<EventType> {
    Ok(match s {
        "task_update" => EventType::TaskUpdate,
        "broadcast" => EventType::Broadcast,
        "completion" => EventType::Completion,
        "error" => EventType::Error,
        other => bail!("unknown event type {other:?} (task_update, broadcast, completion, error)"),
    })
}

/// Translate parsed args into a wire command.
pub(crate) fn to_command(top: TopCommand) -> Result<Command> {
    Ok(match top {
        TopCommand::Init { project_name } => Command::Init { project_name },
        TopCommand::Reset => Command::Reset,
        TopCommand::Status => Command::Status,
        TopCommand::Pause { agent, reason } => Command::Pause { agent, reason },
        TopCommand::Resume { agent } => Command::Resume { agent },
        TopCommand::Join {
            agent,
            capabilities,
        } => Command::Join {
            agent,
            capabilities,
            meta: Default::default(),
        },
        TopCommand::Leave { agent } => Command::Leave { agent },
        TopCommand::Heartbeat { agent } => Command::Heartbeat {
            agent,
            status: None,
        },
        TopCommand::Agents => Command::Agents,
        TopCommand::Task(task) => tasks::to_command(task),
        TopCommand::Broadcast {
            agent,
            content,
            mention,
        } => Command::Broadcast {
            agent,
            content,
            mention,
        },
        TopCommand::Listen { since, limit } => Command::Listen {
            since_seq: Some(since),
            cursor: None,
            limit: Some(limit),
        },
        TopCommand::Lock {
            agent,
            resource,
            ttl,
        } => Command::Lock {
            agent,
            resource,
            ttl_secs: Some(ttl),
        },
        TopCommand::Unlock { agent, resource } => Command::Unlock { agent, resource },
        TopCommand::Locks => Command::Locks,
        TopCommand::Portal(portal) => comms::portal_to_command(portal),
        TopCommand::Vote(vote) => comms::vote_to_command(vote),
        TopCommand::Subscribe {
            agent_filter,
            events,
        } => Command::Subscribe {
            agent_filter,
            event_types: events
                .iter()
                .map(|s| parse_event_type(s))
                .collect::<Result<Vec<_>>>()?,
        },
        TopCommand::Unsubscribe { subscription_id } => Command::Unsubscribe { subscription_id },
        TopCommand::Poll {
            subscription_id,
            keep,
        } => Command::PollEvents {
            subscription_id,
            clear: !keep,
        },
        TopCommand::Walph(cmd) => walph::walph_to_command(cmd),
        TopCommand::Swarm(cmd) => walph::swarm_to_command(cmd),
        TopCommand::Auth(cmd) => room::auth_to_command(cmd)?,
        TopCommand::Shutdown => Command::Shutdown,
    })
}

/// Run one CLI invocation end to end.
pub async fn run(cli: Cli) -> Result<()> {
    let request = Request {
        session: cli.session,
        token: cli.token,
        idempotency_key: None,
        command: to_command(cli.command)?,
    };
    let reply = client::call(&cli.room, &request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return exit_status(&reply);
    }

    room::render(&reply)?;
    exit_status(&reply)
}

fn exit_status(reply: &Reply) -> Result<()> {
    if let Response::Error { kind, message, .. } = &reply.response {
        bail!("{kind}: {message}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
