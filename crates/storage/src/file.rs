// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe JSON-file backend.
//!
//! One record per file, one directory per namespace, all under
//! `<base_path>/.masc/`. Every write goes temp-file → fsync → rename so a
//! crash can never leave a half-written record. Counters and advisory
//! locks are serialized through an in-process mutex plus an `fs2`
//! exclusive file lock, which makes them atomic across processes sharing
//! the same room directory.

use crate::backend::{validate_key, LockRecord, StorageBackend, StorageError};
use fs2::FileExt;
use masc_core::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Directory holding counter files, outside the entity namespaces.
const COUNTERS_DIR: &str = "counters";
/// Cross-process guard file for counter and lock operations.
const GUARD_FILE: &str = ".guard";

/// File-per-record backend rooted at a room's `.masc` directory.
pub struct FileBackend<C: Clock = SystemClock> {
    root: PathBuf,
    secure: bool,
    clock: C,
    write_guard: Mutex<()>,
    tmp_seq: AtomicU64,
}

impl FileBackend<SystemClock> {
    /// Open (creating if needed) the backend at `root`.
    pub fn open(root: impl Into<PathBuf>, secure: bool) -> Result<Self, StorageError> {
        Self::with_clock(root, secure, SystemClock::new())
    }
}

impl<C: Clock> FileBackend<C> {
    pub fn with_clock(root: impl Into<PathBuf>, secure: bool, clock: C) -> Result<Self, StorageError> {
        let root = root.into();
        create_dir_with_mode(&root, secure)?;
        Ok(Self {
            root,
            secure,
            clock,
            write_guard: Mutex::new(()),
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn counter_path(&self, key: &str) -> PathBuf {
        self.root.join(COUNTERS_DIR).join(key)
    }

    /// Write bytes atomically: unique temp file, fsync, rename over target.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            create_dir_with_mode(parent, self.secure)?;
        }
        let n = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp{n}"));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Take the cross-process guard. The returned file holds an exclusive
    /// flock until dropped.
    fn guard_exclusive(&self) -> Result<File, StorageError> {
        let path = self.root.join(GUARD_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_lock_record(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<C: Clock> StorageBackend for FileBackend<C> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        let _guard = self.write_guard.lock();
        self.write_atomic(&self.record_path(key), value)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let _guard = self.write_guard.lock();
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;
        let (dir, stem_prefix) = match prefix.rfind('/') {
            Some(i) => (&prefix[..i], &prefix[i + 1..]),
            None => ("", prefix),
        };
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir)
        };

        let entries = match fs::read_dir(&dir_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !stem.starts_with(stem_prefix) {
                continue;
            }
            if dir.is_empty() {
                keys.push(stem.to_string());
            } else {
                keys.push(format!("{dir}/{stem}"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn atomic_inc(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        validate_key(key)?;
        let _guard = self.write_guard.lock();
        let flock = self.guard_exclusive()?;

        let path = self.counter_path(key);
        let current = match fs::read_to_string(&path) {
            Ok(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|e| StorageError::CorruptCounter {
                    key: key.to_string(),
                    detail: e.to_string(),
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let next = current + delta;
        self.write_atomic(&path, next.to_string().as_bytes())?;
        FileExt::unlock(&flock)?;
        Ok(next)
    }

    fn acquire_lock(&self, key: &str, ttl_secs: u64, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let _guard = self.write_guard.lock();
        let flock = self.guard_exclusive()?;

        let now_ms = self.clock.epoch_ms();
        if let Some(existing) = self.read_lock_record(key)? {
            if !existing.is_expired(now_ms) && existing.owner != owner {
                FileExt::unlock(&flock)?;
                return Ok(false);
            }
        }

        let record = LockRecord {
            owner: owner.to_string(),
            acquired_at_ms: now_ms,
            expires_at_ms: now_ms + ttl_secs * 1000,
        };
        self.write_atomic(&self.record_path(key), &serde_json::to_vec(&record)?)?;
        FileExt::unlock(&flock)?;
        Ok(true)
    }

    fn release_lock(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let _guard = self.write_guard.lock();
        let flock = self.guard_exclusive()?;

        let released = match self.read_lock_record(key)? {
            Some(record) if record.owner == owner => {
                fs::remove_file(self.record_path(key))?;
                true
            }
            _ => false,
        };
        FileExt::unlock(&flock)?;
        Ok(released)
    }
}

/// Prefixes are keys that may end mid-segment or at a `/`.
fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    validate_key(trimmed)
}

#[cfg(unix)]
fn create_dir_with_mode(path: &Path, secure: bool) -> Result<(), StorageError> {
    use std::os::unix::fs::DirBuilderExt;
    if path.exists() {
        return Ok(());
    }
    let mode = if secure { 0o700 } else { 0o755 };
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_dir_with_mode(path: &Path, _secure: bool) -> Result<(), StorageError> {
    fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
