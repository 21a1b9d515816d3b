// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walph loop and swarm subcommands.

use clap::Subcommand;
use masc_daemon::protocol::Command;

#[derive(Debug, Subcommand)]
pub enum WalphCommand {
    /// Start a work loop for an agent
    Start {
        agent: String,
        #[arg(long, default_value = "standard")]
        preset: String,
        #[arg(long)]
        max_iterations: Option<u64>,
    },
    /// Request a clean stop at the next checkpoint
    Stop { agent: String },
    /// Park the loop
    Pause { agent: String },
    /// Wake a parked loop
    Resume { agent: String },
    /// Loop state snapshot
    Status { agent: String },
    /// Remove loop state (refused while running)
    Remove { agent: String },
}

pub(crate) fn walph_to_command(cmd: WalphCommand) -> Command {
    match cmd {
        WalphCommand::Start {
            agent,
            preset,
            max_iterations,
        } => Command::WalphStart {
            agent,
            preset,
            max_iterations,
        },
        WalphCommand::Stop { agent } => Command::WalphStop { agent },
        WalphCommand::Pause { agent } => Command::WalphPause { agent },
        WalphCommand::Resume { agent } => Command::WalphResume { agent },
        WalphCommand::Status { agent } => Command::WalphStatus { agent },
        WalphCommand::Remove { agent } => Command::WalphRemove { agent },
    }
}

#[derive(Debug, Subcommand)]
pub enum SwarmCommand {
    /// Status of every loop in the room
    Status,
    /// Stop every running loop
    Stop,
    /// Pause every running loop
    Pause,
    /// Resume every paused loop
    Resume,
}

pub(crate) fn swarm_to_command(cmd: SwarmCommand) -> Command {
    match cmd {
        SwarmCommand::Status => Command::SwarmStatus,
        SwarmCommand::Stop => Command::SwarmStop,
        SwarmCommand::Pause => Command::SwarmPause,
        SwarmCommand::Resume => Command::SwarmResume,
    }
}
