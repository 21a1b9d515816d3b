// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage backend contract.
//!
//! Keys are `namespace/rest` strings (`tasks/task-1`, `messages/…`) or a
//! bare singleton name (`state`). Advisory lock records live in the
//! regular keyspace as [`LockRecord`] JSON, so `get`/`list` see them like
//! any other record; `acquire_lock`/`release_lock` are the only writers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("counter corrupt at {key}: {detail}")]
    CorruptCounter { key: String, detail: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e.to_string())
    }
}

impl StorageError {
    /// Io failures are transient and may be retried; the rest are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

/// Advisory lock record as stored at the lock's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub owner: String,
    pub acquired_at_ms: u64,
    pub expires_at_ms: u64,
}

impl LockRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// Validate a storage key: bounded, slash-separated segments of
/// `[A-Za-z0-9._%-]`, no empty or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'%' | b'-'))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
    }
    Ok(())
}

/// One storage backend instance, shared by every room task.
///
/// All operations are linearizable per key against the same backend
/// instance; `atomic_inc` and the lock pair are additionally atomic
/// across processes sharing the same underlying store.
pub trait StorageBackend: Send + Sync + 'static {
    /// Snapshot read. `None` when the key has never been written or was deleted.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomic replace of the value at `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Idempotent delete. Returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Keys under `prefix` in lexicographic order, consistent with the
    /// most recent `put`s on this instance.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Add `delta` to the counter at `key` and return the new value.
    /// Linearizable against concurrent `atomic_inc` on the same key.
    fn atomic_inc(&self, key: &str, delta: i64) -> Result<i64, StorageError>;

    /// Try to take the advisory lock at `key` for `owner`. Succeeds when
    /// the lock is free, expired, or already held by `owner` (refreshing
    /// the TTL). At most one live holder at any instant.
    fn acquire_lock(&self, key: &str, ttl_secs: u64, owner: &str) -> Result<bool, StorageError>;

    /// Release the lock at `key` if `owner` holds it. Returns false on
    /// owner mismatch or when no lock exists.
    fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError>;
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
