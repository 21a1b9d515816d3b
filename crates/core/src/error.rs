// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain error taxonomy for room operations.
//!
//! Every mutation returns one of these by value; adapters map them onto
//! protocol-level responses using [`Error::kind`]. Only `Io` and `Backend`
//! are retryable.

use thiserror::Error;

/// Errors surfaced by room operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("room is not initialized")]
    NotInitialized,

    #[error("agent not found: {name}")]
    AgentNotFound { name: String },
    #[error("agent already exists: {name}")]
    AgentAlreadyExists { name: String },

    #[error("task not found: {id}")]
    TaskNotFound { id: String },
    #[error("task {id} is already claimed by {by}")]
    TaskClaimed { id: String, by: String },
    #[error("task {id} is assigned to {by}, not you")]
    TaskNotAssignedToYou { id: String, by: String },
    #[error("invalid task transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("no available tasks")]
    NoAvailableTasks,

    #[error("{file} is locked by {by}")]
    FileLocked { file: String, by: String },
    #[error("{file} is not locked")]
    FileNotLocked { file: String },
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("vote not found: {id}")]
    VoteNotFound { id: String },
    #[error("vote {id} is closed")]
    VoteClosed { id: String },
    #[error("agent {agent} already voted on {id}")]
    AlreadyVoted { id: String, agent: String },

    #[error("agent {agent} already has an open portal")]
    PortalBusy { agent: String },
    #[error("no open portal for {agent}")]
    PortalNotOpen { agent: String },

    #[error("subscription not found: {id}")]
    SubscriptionNotFound { id: String },

    #[error("walph loop already running for {agent}")]
    WalphAlreadyRunning { agent: String },
    #[error("no walph loop running for {agent}")]
    WalphNotRunning { agent: String },

    #[error("room is paused: {reason}")]
    RoomPaused { reason: String },

    #[error("unauthorized")]
    Unauthorized,
    #[error("agent {agent} is not allowed to {action}")]
    Forbidden { agent: String, action: String },
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired for {agent}")]
    TokenExpired { agent: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("operation timed out")]
    Timeout,
    #[error("cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("io error: {detail}")]
    Io { detail: String },
    #[error("backend error: {detail}")]
    Backend { detail: String },
    #[error("schema error: {detail}")]
    Schema { detail: String },
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl Error {
    /// Short machine-readable kind for wire responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotInitialized => "not_initialized",
            Error::AgentNotFound { .. } => "agent_not_found",
            Error::AgentAlreadyExists { .. } => "agent_already_exists",
            Error::TaskNotFound { .. } => "task_not_found",
            Error::TaskClaimed { .. } => "task_claimed",
            Error::TaskNotAssignedToYou { .. } => "task_not_assigned_to_you",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::NoAvailableTasks => "no_available_tasks",
            Error::FileLocked { .. } => "file_locked",
            Error::FileNotLocked { .. } => "file_not_locked",
            Error::InvalidPath { .. } => "invalid_path",
            Error::VoteNotFound { .. } => "vote_not_found",
            Error::VoteClosed { .. } => "vote_closed",
            Error::AlreadyVoted { .. } => "already_voted",
            Error::PortalBusy { .. } => "portal_busy",
            Error::PortalNotOpen { .. } => "portal_not_open",
            Error::SubscriptionNotFound { .. } => "subscription_not_found",
            Error::WalphAlreadyRunning { .. } => "walph_already_running",
            Error::WalphNotRunning { .. } => "walph_not_running",
            Error::RoomPaused { .. } => "room_paused",
            Error::Unauthorized => "unauthorized",
            Error::Forbidden { .. } => "forbidden",
            Error::InvalidToken => "invalid_token",
            Error::TokenExpired { .. } => "token_expired",
            Error::RateLimited { .. } => "rate_limited",
            Error::Timeout => "timeout",
            Error::Cancelled { .. } => "cancelled",
            Error::Io { .. } => "io_error",
            Error::Backend { .. } => "backend_error",
            Error::Schema { .. } => "schema_error",
            Error::Internal { .. } => "internal_error",
        }
    }

    /// Whether the caller may retry the command verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Backend { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
