// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the room daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. One
//! request, one reply per connection. Command names are unqualified;
//! the legacy `masc_*` spellings are accepted as aliases.

use masc_core::{
    AgentMeta, AgentRecord, AgentStatus, Error, EventType, FileLock, Message, Portal, Room,
    StreamEvent, Task, Vote,
};
use masc_engine::{StatusSummary, WalphStatus};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error as ThisError;

/// One command against the room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    #[serde(alias = "masc_init")]
    Init {
        #[serde(default)]
        project_name: Option<String>,
    },

    #[serde(alias = "masc_reset")]
    Reset,

    #[serde(alias = "masc_status")]
    Status,

    /// Pause the room: mutations are rejected until resume
    #[serde(alias = "masc_pause")]
    Pause { agent: String, reason: String },

    #[serde(alias = "masc_resume")]
    Resume { agent: String },

    #[serde(alias = "masc_join")]
    Join {
        agent: String,
        #[serde(default)]
        capabilities: Vec<String>,
        #[serde(default)]
        meta: AgentMeta,
    },

    #[serde(alias = "masc_leave")]
    Leave { agent: String },

    #[serde(alias = "masc_heartbeat")]
    Heartbeat {
        agent: String,
        #[serde(default)]
        status: Option<AgentStatus>,
    },

    #[serde(alias = "masc_agents")]
    Agents,

    #[serde(alias = "masc_tasks")]
    Tasks,

    #[serde(alias = "masc_add_task")]
    AddTask {
        agent: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default = "default_priority")]
        priority: u8,
        #[serde(default)]
        files: Vec<String>,
        #[serde(default)]
        required_caps: Vec<String>,
    },

    #[serde(alias = "masc_claim")]
    Claim { agent: String, task_id: String },

    #[serde(alias = "masc_claim_next")]
    ClaimNext {
        agent: String,
        #[serde(default)]
        capabilities: Option<Vec<String>>,
    },

    #[serde(alias = "masc_release")]
    Release { agent: String, task_id: String },

    #[serde(alias = "masc_done")]
    Done {
        agent: String,
        task_id: String,
        #[serde(default)]
        notes: Option<String>,
    },

    #[serde(alias = "masc_cancel_task")]
    CancelTask {
        agent: String,
        task_id: String,
        #[serde(default)]
        reason: Option<String>,
    },

    /// Generic state-machine transition by target state name
    #[serde(alias = "masc_transition")]
    Transition {
        agent: String,
        task_id: String,
        to: String,
    },

    #[serde(alias = "masc_update_priority")]
    UpdatePriority {
        agent: String,
        task_id: String,
        priority: u8,
    },

    #[serde(alias = "masc_broadcast")]
    Broadcast {
        agent: String,
        content: String,
        #[serde(default)]
        mention: Option<String>,
    },

    /// Read messages after a seq or an opaque cursor
    #[serde(alias = "masc_listen")]
    Listen {
        #[serde(default)]
        since_seq: Option<u64>,
        #[serde(default)]
        cursor: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },

    #[serde(alias = "masc_lock")]
    Lock {
        agent: String,
        resource: String,
        #[serde(default)]
        ttl_secs: Option<u64>,
    },

    #[serde(alias = "masc_unlock")]
    Unlock { agent: String, resource: String },

    #[serde(alias = "masc_locks")]
    Locks,

    #[serde(alias = "masc_portal_open")]
    PortalOpen { agent: String, peer: String },

    #[serde(alias = "masc_portal_send")]
    PortalSend {
        agent: String,
        content: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },

    #[serde(alias = "masc_portal_close")]
    PortalClose { agent: String },

    #[serde(alias = "masc_portal_status")]
    PortalStatus { agent: String },

    #[serde(alias = "masc_vote_create")]
    VoteCreate {
        agent: String,
        topic: String,
        options: Vec<String>,
        required_votes: u32,
    },

    #[serde(alias = "masc_vote_cast")]
    VoteCast {
        agent: String,
        vote_id: String,
        option: String,
    },

    /// Close a vote early; proposer only
    #[serde(alias = "masc_vote_close")]
    VoteClose { agent: String, vote_id: String },

    #[serde(alias = "masc_vote_status")]
    VoteStatus,

    #[serde(alias = "masc_subscribe")]
    Subscribe {
        #[serde(default)]
        agent_filter: Option<String>,
        #[serde(default)]
        event_types: Vec<EventType>,
    },

    #[serde(alias = "masc_unsubscribe")]
    Unsubscribe { subscription_id: String },

    #[serde(alias = "masc_poll_events")]
    PollEvents {
        subscription_id: String,
        #[serde(default = "default_clear")]
        clear: bool,
    },

    #[serde(alias = "masc_walph_start")]
    WalphStart {
        agent: String,
        #[serde(default = "default_preset")]
        preset: String,
        #[serde(default)]
        max_iterations: Option<u64>,
    },

    #[serde(alias = "masc_walph_stop")]
    WalphStop { agent: String },

    #[serde(alias = "masc_walph_pause")]
    WalphPause { agent: String },

    #[serde(alias = "masc_walph_resume")]
    WalphResume { agent: String },

    #[serde(alias = "masc_walph_status")]
    WalphStatus { agent: String },

    #[serde(alias = "masc_walph_remove")]
    WalphRemove { agent: String },

    #[serde(alias = "masc_swarm_status")]
    SwarmStatus,
    #[serde(alias = "masc_swarm_stop")]
    SwarmStop,
    #[serde(alias = "masc_swarm_pause")]
    SwarmPause,
    #[serde(alias = "masc_swarm_resume")]
    SwarmResume,

    /// Enable auth; returns the room secret exactly once
    #[serde(alias = "masc_auth_enable")]
    AuthEnable,

    /// Mint one agent token; requires the room secret
    #[serde(alias = "masc_auth_create_token")]
    AuthCreateToken {
        agent: String,
        role: crate::auth::Role,
        secret: String,
    },

    /// Request daemon shutdown
    Shutdown,
}

fn default_priority() -> u8 {
    3
}

fn default_clear() -> bool {
    true
}

fn default_preset() -> String {
    "standard".to_string()
}

/// Request envelope: session/token context plus one command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Client-generated key for create commands; replays within the
    /// window return the cached response
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub command: Command,
}

impl Request {
    pub fn bare(command: Command) -> Self {
        Self {
            session: None,
            token: None,
            idempotency_key: None,
            command,
        }
    }
}

/// Reply envelope: the (possibly freshly assigned) session id plus result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub session: String,
    pub response: Response,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    ShuttingDown,

    Room { room: Room },
    Status { status: StatusSummary },

    Agent { agent: AgentRecord },
    Agents { agents: Vec<AgentRecord> },

    Task { task: Task },
    Tasks { tasks: Vec<Task> },

    Seq { seq: u64 },
    Messages {
        messages: Vec<Message>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_cursor: Option<String>,
    },

    Lock { lock: FileLock },
    Locks { locks: Vec<FileLock> },

    Portal { portal: Option<Box<Portal>> },

    Vote { vote: Box<Vote> },
    Votes { votes: Vec<Vote> },

    Subscribed { subscription_id: String },
    Unsubscribed { removed: bool },
    Events { events: Vec<StreamEvent> },

    Walph { status: WalphStatus },
    Swarm { statuses: Vec<WalphStatus> },
    Removed { removed: bool },

    /// Room secret, shown exactly once
    Secret { secret: String },
    /// Agent token, shown exactly once
    Token { agent: String, token: String },

    Error {
        kind: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },
}

impl Response {
    pub fn from_error(e: &Error) -> Self {
        let retry_after_secs = match e {
            Error::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        Response::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
            retry_after_secs,
        }
    }
}

/// Protocol errors
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Maximum message size (16 MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default IPC timeout
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Protocol version
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encode a message to JSON bytes (without length prefix)
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(json)
}

/// Decode a message from wire format
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader
pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer
pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request with timeout
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write a reply with timeout
pub async fn write_reply<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    reply: &Reply,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(reply)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
