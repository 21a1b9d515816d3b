// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-daemon: The session & auth gate and its unix-socket listener.
//!
//! Every command from every adapter passes through [`Gate::dispatch`];
//! there is no other write path into the room.

pub mod auth;
pub mod gate;
pub mod idempotency;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod rate_limit;
pub mod sessions;

pub use auth::{required_permission, AuthStore, Permission, Role};
pub use gate::Gate;
pub use lifecycle::{Daemon, DaemonConfig, LifecycleError};
pub use listener::Listener;
pub use protocol::{Command, ProtocolError, Reply, Request, Response};
pub use rate_limit::RateLimiter;
pub use sessions::SessionTable;
