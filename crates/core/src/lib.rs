// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-core: Data model for the MASC coordination room

pub mod agent;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod lock;
pub mod message;
pub mod portal;
pub mod room;
pub mod session;
pub mod task;
pub mod time_fmt;
pub mod vote;

pub use agent::{validate_agent_name, AgentMeta, AgentRecord, AgentStatus, AGENT_NAME_MAX};
pub use cancel::{CancellationToken, TokenStore};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BackendKind, RoomConfig};
pub use error::Error;
pub use event::{AuditEvent, AuditRecord, EventType, StreamEvent};
pub use id::{IdGen, SequentialIdGen, ShortId, SubscriptionId, UuidIdGen};
pub use lock::{escape_resource, unescape_resource, FileLock};
pub use message::{Message, MsgType};
pub use portal::{Portal, PortalMessage, PORTAL_BUFFER_CAP};
pub use room::{Room, PROTOCOL_VERSION};
pub use session::{generate_session_id, validate_session_id, SessionId};
pub use task::{validate_priority, Task, TaskId, TaskStatus, PRIORITY_MAX, PRIORITY_MIN};
pub use time_fmt::format_elapsed;
pub use vote::{Vote, VoteId, VoteState};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
