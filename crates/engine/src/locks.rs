// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locks over room resources.
//!
//! Resources are normalized relative paths under `base_path`; anything
//! escaping the room is rejected before it reaches storage. Expired
//! locks read as free even before the sweeper deletes them.

use crate::room::{keys, ms_to_utc, store_err, RoomEngine};
use masc_core::{escape_resource, unescape_resource, AuditEvent, Clock, Error, FileLock};
use masc_storage::LockRecord;

impl<C: Clock> RoomEngine<C> {
    /// Acquire an advisory lock on `resource` for `ttl_secs`.
    pub fn lock(&self, agent: &str, resource: &str, ttl_secs: u64) -> Result<FileLock, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(agent)?;
        let normalized = normalize_resource(resource)?;
        let key = keys::lock(&escape_resource(&normalized));

        let acquired = self
            .backend
            .acquire_lock(&key, ttl_secs, agent)
            .map_err(store_err)?;
        if !acquired {
            let by = self
                .lock_record(&key)?
                .map(|r| r.owner)
                .unwrap_or_else(|| "unknown".to_string());
            return Err(Error::FileLocked {
                file: normalized,
                by,
            });
        }

        self.audit(AuditEvent::FileLocked {
            file: normalized.clone(),
            by: agent.to_string(),
        });
        let now_ms = self.clock.epoch_ms();
        Ok(FileLock {
            resource: normalized,
            owner: agent.to_string(),
            acquired_at: ms_to_utc(now_ms),
            expires_at: ms_to_utc(now_ms + ttl_secs * 1000),
        })
    }

    /// Release a lock held by `agent`.
    pub fn unlock(&self, agent: &str, resource: &str) -> Result<(), Error> {
        self.room()?;
        self.require_active_agent(agent)?;
        let normalized = normalize_resource(resource)?;
        let key = keys::lock(&escape_resource(&normalized));

        let released = self
            .backend
            .release_lock(&key, agent)
            .map_err(store_err)?;
        if released {
            self.audit(AuditEvent::FileUnlocked {
                file: normalized,
                by: agent.to_string(),
                reason: "unlock".to_string(),
            });
            return Ok(());
        }

        match self.lock_record(&key)? {
            Some(record) if !record.is_expired(self.clock.epoch_ms()) => Err(Error::FileLocked {
                file: normalized,
                by: record.owner,
            }),
            _ => Err(Error::FileNotLocked { file: normalized }),
        }
    }

    /// Live (unexpired) locks, for status and dashboards.
    pub fn list_locks(&self) -> Result<Vec<FileLock>, Error> {
        let now_ms = self.clock.epoch_ms();
        let mut locks = Vec::new();
        for key in self.backend.list(keys::LOCKS).map_err(store_err)? {
            let Some(record) = self.lock_record(&key)? else {
                continue;
            };
            if record.is_expired(now_ms) {
                continue;
            }
            let Some(escaped) = key.strip_prefix(keys::LOCKS) else {
                continue;
            };
            locks.push(FileLock {
                resource: unescape_resource(escaped),
                owner: record.owner,
                acquired_at: ms_to_utc(record.acquired_at_ms),
                expires_at: ms_to_utc(record.expires_at_ms),
            });
        }
        Ok(locks)
    }

    /// Delete expired lock records. Returns how many were evicted.
    pub fn sweep_expired_locks(&self) -> Result<usize, Error> {
        let now_ms = self.clock.epoch_ms();
        let mut evicted = 0;
        for key in self.backend.list(keys::LOCKS).map_err(store_err)? {
            let Some(record) = self.lock_record(&key)? else {
                continue;
            };
            if !record.is_expired(now_ms) {
                continue;
            }
            self.backend.delete(&key).map_err(store_err)?;
            evicted += 1;
            if let Some(escaped) = key.strip_prefix(keys::LOCKS) {
                self.audit(AuditEvent::FileUnlocked {
                    file: unescape_resource(escaped),
                    by: record.owner,
                    reason: "expired".to_string(),
                });
            }
        }
        Ok(evicted)
    }

    /// Release every lock `owner` holds (agent left or went zombie).
    pub(crate) fn release_locks_owned_by(&self, owner: &str, reason: &str) -> Result<(), Error> {
        for key in self.backend.list(keys::LOCKS).map_err(store_err)? {
            let Some(record) = self.lock_record(&key)? else {
                continue;
            };
            if record.owner != owner {
                continue;
            }
            self.backend.delete(&key).map_err(store_err)?;
            if let Some(escaped) = key.strip_prefix(keys::LOCKS) {
                self.audit(AuditEvent::FileUnlocked {
                    file: unescape_resource(escaped),
                    by: owner.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }

    fn lock_record(&self, key: &str) -> Result<Option<LockRecord>, Error> {
        self.get_json::<LockRecord>(key)
    }
}

/// Normalize a resource to a clean relative path under `base_path`.
pub fn normalize_resource(resource: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidPath {
        path: resource.to_string(),
    };

    if resource.is_empty() || resource.len() > 512 {
        return Err(invalid());
    }
    if resource.starts_with('/') || resource.contains('\\') || resource.contains('\0') {
        return Err(invalid());
    }

    let mut parts = Vec::new();
    for part in resource.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid()),
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        return Err(invalid());
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
