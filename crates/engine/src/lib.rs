// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-engine: The room state engine and its supervisors.
//!
//! [`RoomEngine`] owns every mutation over the data model and notifies
//! the [`EventFabric`] after each state transition. Background GC loops
//! live in [`gc`]; the per-agent walph loop in [`walph`].

#[cfg(test)]
pub(crate) mod test_helpers;

pub mod cursor;
pub mod fabric;
pub mod gc;
pub mod locks;
pub mod messages;
pub mod portals;
pub mod room;
pub mod tasks;
pub mod votes;
pub mod walph;

pub use cursor::{Cursor, CursorKind};
pub use fabric::{EventFabric, MAX_BUFFERED_EVENTS};
pub use gc::{GcConfig, Shutdown, Supervisors};
pub use room::{RoomEngine, StatusSummary, TaskCounts};
pub use walph::{state_key, WalphStatus, WalphSupervisor};
