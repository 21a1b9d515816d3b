// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth subcommands and human-readable rendering of replies.

use anyhow::{bail, Result};
use clap::Subcommand;
use masc_core::format_elapsed;
use masc_daemon::auth::Role;
use masc_daemon::protocol::{Command, Reply, Response};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Enable auth; prints the room secret exactly once
    Enable,
    /// Mint one agent token against the room secret
    Token {
        agent: String,
        /// admin, worker, or observer
        #[arg(long, default_value = "worker")]
        role: String,
        #[arg(long)]
        secret: String,
    },
}

pub(crate) fn auth_to_command(cmd: AuthCommand) -> Result<Command> {
    Ok(match cmd {
        AuthCommand::Enable => Command::AuthEnable,
        AuthCommand::Token {
            agent,
            role,
            secret,
        } => Command::AuthCreateToken {
            agent,
            role: parse_role(&role)?,
            secret,
        },
    })
}

pub(crate) fn parse_role(s: &str) -> Result<Role> {
    Ok(match s {
        "admin" => Role::Admin,
        "worker" => Role::Worker,
        "observer" => Role::Observer,
        other => bail!("unknown role {other:?} (admin, worker, observer)"),
    })
}

/// Print a reply for humans. Errors are rendered by the caller.
pub(crate) fn render(reply: &Reply) -> Result<()> {
    match &reply.response {
        Response::Ok => println!("ok"),
        Response::Pong => println!("pong"),
        Response::Hello { version } => println!("mascd {version}"),
        Response::ShuttingDown => println!("daemon shutting down"),

        Response::Room { room } => {
            println!("room {} initialized (seq {})", room.project_name, room.message_seq);
        }
        Response::Status { status } => {
            println!(
                "{} [{}] up {}{}",
                status.project_name,
                status.protocol_version,
                format_elapsed(status.uptime_secs),
                if status.paused { " PAUSED" } else { "" }
            );
            println!("  agents: {}", status.active_agents.join(", "));
            let c = status.task_counts;
            println!(
                "  tasks: {} todo, {} claimed, {} in progress, {} done, {} cancelled",
                c.todo, c.claimed, c.in_progress, c.done, c.cancelled
            );
            println!(
                "  locks: {}   open votes: {}   next seq: {}",
                status.held_locks, status.open_votes, status.message_seq
            );
            for walph in &status.swarm {
                print!("  walph ");
                render_walph(walph);
            }
        }

        Response::Agent { agent } => {
            println!("{} [{}] caps: {}", agent.name, agent.status, agent.capabilities.join(","));
        }
        Response::Agents { agents } => {
            for agent in agents {
                let task = agent
                    .current_task
                    .as_ref()
                    .map(|t| format!(" on {t}"))
                    .unwrap_or_default();
                println!("{} [{}]{}", agent.name, agent.status, task);
            }
        }

        Response::Task { task } => {
            println!("{} [{}] p{} {}", task.id, task.status.label(), task.priority, task.title);
        }
        Response::Tasks { tasks } => {
            for task in tasks {
                let assignee = task
                    .status
                    .assignee()
                    .map(|a| format!(" @{a}"))
                    .unwrap_or_default();
                println!(
                    "{} [{}] p{} {}{}",
                    task.id,
                    task.status.label(),
                    task.priority,
                    task.title,
                    assignee
                );
            }
        }

        Response::Seq { seq } => println!("sent (seq {seq})"),
        Response::Messages { messages, .. } => {
            for message in messages {
                let mention = message
                    .mention
                    .as_ref()
                    .map(|m| format!(" @{m}"))
                    .unwrap_or_default();
                println!("#{} {}{}: {}", message.seq, message.from_agent, mention, message.content);
            }
        }

        Response::Lock { lock } => {
            println!("locked {} until {}", lock.resource, lock.expires_at);
        }
        Response::Locks { locks } => {
            for lock in locks {
                println!("{} held by {} until {}", lock.resource, lock.owner, lock.expires_at);
            }
        }

        Response::Portal { portal: Some(portal) } => {
            println!("portal {} <-> {} ({} buffered)", portal.owner, portal.peer, portal.messages.len());
            for message in &portal.messages {
                println!("  {}: {}", message.from, message.content);
            }
        }
        Response::Portal { portal: None } => println!("no open portal"),

        Response::Vote { vote } => render_vote(vote),
        Response::Votes { votes } => {
            for vote in votes {
                render_vote(vote);
            }
        }

        Response::Subscribed { subscription_id } => println!("{subscription_id}"),
        Response::Unsubscribed { removed } => {
            println!("{}", if *removed { "unsubscribed" } else { "unknown subscription" })
        }
        Response::Events { events } => {
            for event in events {
                println!("[{}] {} {}", event.event_type, event.agent, event.data);
            }
        }

        Response::Walph { status } => render_walph(status),
        Response::Swarm { statuses } => {
            for status in statuses {
                render_walph(status);
            }
        }
        Response::Removed { removed } => {
            println!("{}", if *removed { "removed" } else { "nothing to remove" })
        }

        Response::Secret { secret } => {
            println!("{secret}");
            eprintln!("store this secret now; it is not shown again");
        }
        Response::Token { agent, token } => {
            println!("{token}");
            eprintln!("token for {agent}; it is not shown again");
        }

        Response::Error { .. } => {}
    }
    Ok(())
}

fn render_vote(vote: &masc_core::Vote) {
    let state = match vote.state {
        masc_core::VoteState::Open => format!(
            "open {}/{}",
            vote.ballots.len(),
            vote.required_votes
        ),
        masc_core::VoteState::Closed => {
            format!("closed: {}", vote.result.as_deref().unwrap_or("-"))
        }
    };
    println!("{} {:?} [{}]", vote.vote_id, vote.topic, state);
}

fn render_walph(status: &masc_engine::WalphStatus) {
    let state = if !status.running {
        "stopped"
    } else if status.paused {
        "paused"
    } else {
        "running"
    };
    println!(
        "{} [{}] preset={} iterations={} completed={}",
        status.agent, state, status.preset, status.iterations, status.completed
    );
}
