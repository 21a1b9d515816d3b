// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portal and vote subcommands.

use clap::Subcommand;
use masc_daemon::protocol::Command;

#[derive(Debug, Subcommand)]
pub enum PortalCommand {
    /// Open a portal to a peer agent
    Open { agent: String, peer: String },
    /// Send into the portal involving this agent, waiting if needed
    Send {
        agent: String,
        content: String,
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Close this agent's portal
    Close { agent: String },
    /// Show the portal involving this agent
    Status { agent: String },
}

pub(crate) fn portal_to_command(cmd: PortalCommand) -> Command {
    match cmd {
        PortalCommand::Open { agent, peer } => Command::PortalOpen { agent, peer },
        PortalCommand::Send {
            agent,
            content,
            timeout,
        } => Command::PortalSend {
            agent,
            content,
            timeout_secs: timeout,
        },
        PortalCommand::Close { agent } => Command::PortalClose { agent },
        PortalCommand::Status { agent } => Command::PortalStatus { agent },
    }
}

#[derive(Debug, Subcommand)]
pub enum VoteCommand {
    /// Open a vote
    Create {
        agent: String,
        topic: String,
        /// Comma-separated options (at least two)
        #[arg(value_delimiter = ',')]
        options: Vec<String>,
        #[arg(long, default_value_t = 1)]
        required: u32,
    },
    /// Cast a ballot
    Cast {
        agent: String,
        vote_id: String,
        option: String,
    },
    /// Close a vote early (proposer only)
    Close { agent: String, vote_id: String },
    /// List votes
    Status,
}

pub(crate) fn vote_to_command(cmd: VoteCommand) -> Command {
    match cmd {
        VoteCommand::Create {
            agent,
            topic,
            options,
            required,
        } => Command::VoteCreate {
            agent,
            topic,
            options,
            required_votes: required,
        },
        VoteCommand::Cast {
            agent,
            vote_id,
            option,
        } => Command::VoteCast {
            agent,
            vote_id,
            option,
        },
        VoteCommand::Close { agent, vote_id } => Command::VoteClose { agent, vote_id },
        VoteCommand::Status => Command::VoteStatus,
    }
}
