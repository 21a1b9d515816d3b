// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite backend: one table per entity namespace with a JSON value
//! column, transactional UPSERTs, WAL journal mode.

use crate::backend::{validate_key, LockRecord, StorageBackend, StorageError};
use masc_core::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;

struct Inner {
    conn: Connection,
    tables: HashSet<String>,
}

/// Single-file SQLite store for a room.
pub struct SqliteBackend<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    clock: C,
}

impl SqliteBackend<SystemClock> {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::with_clock(path, SystemClock::new())
    }
}

impl<C: Clock> SqliteBackend<C> {
    pub fn with_clock(path: &Path, clock: C) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;
             CREATE TABLE IF NOT EXISTS counters (
                 key TEXT PRIMARY KEY,
                 value INTEGER NOT NULL
             );",
        )?;
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                tables: HashSet::new(),
            }),
            clock,
        })
    }
}

/// Map a key to its namespace table name: `tasks/task-1` → `rec_tasks`,
/// a bare singleton like `state` → `rec_root`.
fn table_for(key: &str) -> String {
    let ns = key.split_once('/').map(|(ns, _)| ns).unwrap_or("root");
    let sanitized: String = ns
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("rec_{sanitized}")
}

fn ensure_table(inner: &mut Inner, table: &str) -> Result<(), StorageError> {
    if inner.tables.contains(table) {
        return Ok(());
    }
    inner.conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
             key TEXT PRIMARY KEY,
             value BLOB NOT NULL
         );"
    ))?;
    inner.tables.insert(table.to_string());
    Ok(())
}

fn get_in(inner: &Inner, table: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
    let value = inner
        .conn
        .query_row(
            &format!("SELECT value FROM \"{table}\" WHERE key = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

impl<C: Clock> StorageBackend for SqliteBackend<C> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let table = table_for(key);
        ensure_table(&mut inner, &table)?;
        get_in(&inner, &table, key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let table = table_for(key);
        ensure_table(&mut inner, &table)?;
        inner.conn.execute(
            &format!(
                "INSERT INTO \"{table}\" (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let table = table_for(key);
        ensure_table(&mut inner, &table)?;
        let affected = inner.conn.execute(
            &format!("DELETE FROM \"{table}\" WHERE key = ?1"),
            params![key],
        )?;
        Ok(affected > 0)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut inner = self.inner.lock();
        let table = table_for(prefix.strip_suffix('/').unwrap_or(prefix));
        ensure_table(&mut inner, &table)?;
        let mut stmt = inner
            .conn
            .prepare(&format!("SELECT key FROM \"{table}\" ORDER BY key"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            let key = row?;
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn atomic_inc(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let tx = inner
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO counters (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = value + ?2",
            params![key, delta],
        )?;
        let value: i64 = tx.query_row(
            "SELECT value FROM counters WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(value)
    }

    fn acquire_lock(&self, key: &str, ttl_secs: u64, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let table = table_for(key);
        ensure_table(&mut inner, &table)?;

        let tx = inner
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<Vec<u8>> = tx
            .query_row(
                &format!("SELECT value FROM \"{table}\" WHERE key = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(bytes) = existing {
            let record: LockRecord = serde_json::from_slice(&bytes)?;
            if !record.is_expired(now_ms) && record.owner != owner {
                return Ok(false);
            }
        }
        let record = LockRecord {
            owner: owner.to_string(),
            acquired_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_secs * 1000,
        };
        tx.execute(
            &format!(
                "INSERT INTO \"{table}\" (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            params![key, serde_json::to_vec(&record)?],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let table = table_for(key);
        ensure_table(&mut inner, &table)?;

        let tx = inner
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<Vec<u8>> = tx
            .query_row(
                &format!("SELECT value FROM \"{table}\" WHERE key = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let released = match existing {
            Some(bytes) => {
                let record: LockRecord = serde_json::from_slice(&bytes)?;
                if record.owner == owner {
                    tx.execute(
                        &format!("DELETE FROM \"{table}\" WHERE key = ?1"),
                        params![key],
                    )?;
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        tx.commit()?;
        Ok(released)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
