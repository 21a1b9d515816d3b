// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task board subcommands.

use clap::Subcommand;
use masc_daemon::protocol::Command;

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// List tasks on the board
    List,
    /// Add a task
    Add {
        agent: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// 1 = highest, 5 = lowest
        #[arg(long, default_value_t = 3)]
        priority: u8,
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
        /// Capabilities an agent must advertise to auto-claim this task
        #[arg(long, value_delimiter = ',')]
        required_caps: Vec<String>,
    },
    /// Claim a specific task
    Claim { agent: String, task_id: String },
    /// Claim the best matching todo task
    Next {
        agent: String,
        #[arg(long, value_delimiter = ',')]
        capabilities: Option<Vec<String>>,
    },
    /// Give a claimed task back to the board
    Release { agent: String, task_id: String },
    /// Mark an assigned task done
    Done {
        agent: String,
        task_id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel a task
    Cancel {
        agent: String,
        task_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Transition a task to a named state
    Transition {
        agent: String,
        task_id: String,
        to: String,
    },
    /// Update a task's priority
    Priority {
        agent: String,
        task_id: String,
        priority: u8,
    },
}

pub(crate) fn to_command(cmd: TaskCommand) -> Command {
    match cmd {
        TaskCommand::List => Command::Tasks,
        TaskCommand::Add {
            agent,
            title,
            description,
            priority,
            files,
            required_caps,
        } => Command::AddTask {
            agent,
            title,
            description,
            priority,
            files,
            required_caps,
        },
        TaskCommand::Claim { agent, task_id } => Command::Claim { agent, task_id },
        TaskCommand::Next {
            agent,
            capabilities,
        } => Command::ClaimNext {
            agent,
            capabilities,
        },
        TaskCommand::Release { agent, task_id } => Command::Release { agent, task_id },
        TaskCommand::Done {
            agent,
            task_id,
            notes,
        } => Command::Done {
            agent,
            task_id,
            notes,
        },
        TaskCommand::Cancel {
            agent,
            task_id,
            reason,
        } => Command::CancelTask {
            agent,
            task_id,
            reason,
        },
        TaskCommand::Transition {
            agent,
            task_id,
            to,
        } => Command::Transition {
            agent,
            task_id,
            to,
        },
        TaskCommand::Priority {
            agent,
            task_id,
            priority,
        } => Command::UpdatePriority {
            agent,
            task_id,
            priority,
        },
    }
}
