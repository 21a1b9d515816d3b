// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for tests and ephemeral rooms.
//!
//! Same contract as the file backend, one mutexed map instead of a
//! directory tree. Clones share storage.

use crate::backend::{validate_key, LockRecord, StorageBackend, StorageError};
use masc_core::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Vec<u8>>,
    counters: BTreeMap<String, i64>,
    fail_puts: bool,
}

/// Heap-backed storage; nothing survives the process.
#[derive(Clone)]
pub struct MemoryBackend<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl MemoryBackend<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl Default for MemoryBackend<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryBackend<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    /// Make every subsequent `put` fail with an io error. Lets tests
    /// exercise seq-gap tolerance and retry paths.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_fail_puts(&self, fail: bool) {
        self.inner.lock().fail_puts = fail;
    }

    fn read_lock_record(inner: &Inner, key: &str) -> Result<Option<LockRecord>, StorageError> {
        match inner.records.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }
}

impl<C: Clock> StorageBackend for MemoryBackend<C> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.inner.lock().records.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        if inner.fail_puts {
            return Err(StorageError::Io(std::io::Error::other(
                "injected put failure",
            )));
        }
        inner.records.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.inner.lock().records.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn atomic_inc(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let value = inner.counters.entry(key.to_string()).or_insert(0);
        *value += delta;
        Ok(*value)
    }

    fn acquire_lock(&self, key: &str, ttl_secs: u64, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        if let Some(existing) = Self::read_lock_record(&inner, key)? {
            if !existing.is_expired(now_ms) && existing.owner != owner {
                return Ok(false);
            }
        }
        let record = LockRecord {
            owner: owner.to_string(),
            acquired_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_secs * 1000,
        };
        inner
            .records
            .insert(key.to_string(), serde_json::to_vec(&record)?);
        Ok(true)
    }

    fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        match Self::read_lock_record(&inner, key)? {
            Some(record) if record.owner == owner => {
                inner.records.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
