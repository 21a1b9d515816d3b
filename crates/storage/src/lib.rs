// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-storage: Pluggable persistence for the room state engine.
//!
//! The engine talks to one [`StorageBackend`]; the backend owns the
//! bytes. Three implementations ship: a crash-safe JSON-file backend,
//! a SQLite backend, and an in-memory backend for tests and ephemeral
//! rooms.

pub mod audit;
pub mod backend;
pub mod file;
pub mod memory;
pub mod sqlite;

pub use audit::{read_audit_file, AuditSink, FileAudit, MemoryAudit};
pub use backend::{validate_key, LockRecord, StorageBackend, StorageError};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::path::{Path, PathBuf};

/// Name of the room state directory under `base_path`.
pub const MASC_DIR: &str = ".masc";

/// Root of the persistent state for a room.
pub fn masc_root(base_path: &Path) -> PathBuf {
    base_path.join(MASC_DIR)
}
