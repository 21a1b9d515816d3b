// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token auth: roles, permissions, hashed secrets.
//!
//! Tokens are stored as SHA-256 hashes; the plaintext is returned
//! exactly once at mint time. Auth state persists through the storage
//! backend under `security/auth` so it survives restarts. When auth is
//! disabled, or a session bears no token, the caller acts as `Worker`.

use crate::protocol::Command;
use masc_core::{Clock, Error};
use masc_storage::{StorageBackend, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Caller role with a static permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Worker,
    Observer,
}

/// Permission tags, one required per mutating tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    CanInit,
    CanReset,
    CanPause,
    CanJoin,
    CanClaimTask,
    CanEditTask,
    CanBroadcast,
    CanLock,
    CanVote,
    CanPortal,
    CanSubscribe,
    CanWalph,
    CanSwarm,
    CanRead,
    CanAdmin,
}

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[
                CanInit,
                CanReset,
                CanPause,
                CanJoin,
                CanClaimTask,
                CanEditTask,
                CanBroadcast,
                CanLock,
                CanVote,
                CanPortal,
                CanSubscribe,
                CanWalph,
                CanSwarm,
                CanRead,
                CanAdmin,
            ],
            Role::Worker => &[
                CanInit,
                CanJoin,
                CanClaimTask,
                CanEditTask,
                CanBroadcast,
                CanLock,
                CanVote,
                CanPortal,
                CanSubscribe,
                CanWalph,
                CanRead,
            ],
            Role::Observer => &[CanJoin, CanSubscribe, CanRead],
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// The permission a command needs; `None` for unauthenticated basics.
pub fn required_permission(command: &Command) -> Option<Permission> {
    use Permission::*;
    Some(match command {
        Command::Ping | Command::Hello { .. } => return None,
        Command::Init { .. } => CanInit,
        Command::Reset => CanReset,
        Command::Pause { .. } | Command::Resume { .. } => CanPause,
        Command::Shutdown => CanAdmin,
        Command::AuthEnable | Command::AuthCreateToken { .. } => CanAdmin,

        Command::Join { .. } | Command::Leave { .. } | Command::Heartbeat { .. } => CanJoin,

        Command::Claim { .. } | Command::ClaimNext { .. } | Command::Release { .. } => CanClaimTask,
        Command::AddTask { .. }
        | Command::Done { .. }
        | Command::CancelTask { .. }
        | Command::Transition { .. }
        | Command::UpdatePriority { .. } => CanEditTask,

        Command::Broadcast { .. } => CanBroadcast,
        Command::Lock { .. } | Command::Unlock { .. } => CanLock,
        Command::VoteCreate { .. } | Command::VoteCast { .. } | Command::VoteClose { .. } => {
            CanVote
        }
        Command::PortalOpen { .. }
        | Command::PortalSend { .. }
        | Command::PortalClose { .. } => CanPortal,
        Command::Subscribe { .. }
        | Command::Unsubscribe { .. }
        | Command::PollEvents { .. } => CanSubscribe,

        Command::WalphStart { .. }
        | Command::WalphStop { .. }
        | Command::WalphPause { .. }
        | Command::WalphResume { .. }
        | Command::WalphRemove { .. } => CanWalph,
        Command::SwarmStop | Command::SwarmPause | Command::SwarmResume => CanSwarm,

        Command::Status
        | Command::Agents
        | Command::Tasks
        | Command::Listen { .. }
        | Command::Locks
        | Command::PortalStatus { .. }
        | Command::VoteStatus
        | Command::WalphStatus { .. }
        | Command::SwarmStatus => CanRead,
    })
}

const AUTH_KEY: &str = "security/auth";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenRecord {
    hash: String,
    role: Role,
    issued_at_ms: u64,
    ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthState {
    schema_version: u32,
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_hash: Option<String>,
    #[serde(default)]
    tokens: HashMap<String, TokenRecord>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            enabled: false,
            secret_hash: None,
            tokens: HashMap::new(),
        }
    }
}

/// Room auth store, persisted through the backend.
pub struct AuthStore {
    backend: Arc<dyn StorageBackend>,
    state: Mutex<AuthState>,
    token_ttl_secs: u64,
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn random_hex(bytes: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

fn persist_err(e: StorageError) -> Error {
    Error::Backend {
        detail: format!("auth state: {e}"),
    }
}

impl AuthStore {
    /// Load persisted auth state, or start disabled.
    pub fn load(backend: Arc<dyn StorageBackend>, token_ttl_secs: u64) -> Self {
        let state = backend
            .get(AUTH_KEY)
            .ok()
            .flatten()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            backend,
            state: Mutex::new(state),
            token_ttl_secs,
        }
    }

    /// Force-enable for tests and pre-configured rooms.
    pub fn load_enabled(backend: Arc<dyn StorageBackend>, token_ttl_secs: u64) -> Self {
        let store = Self::load(backend, token_ttl_secs);
        store.state.lock().enabled = true;
        store
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Whether a room secret has ever been minted. Until one exists,
    /// `enable` is open to any caller (the bootstrap path).
    pub fn has_secret(&self) -> bool {
        self.state.lock().secret_hash.is_some()
    }

    /// Turn auth on. Returns the room secret, exactly once.
    pub fn enable(&self) -> Result<String, Error> {
        let mut state = self.state.lock();
        if state.enabled && state.secret_hash.is_some() {
            return Err(Error::Forbidden {
                agent: "caller".to_string(),
                action: "enable auth twice".to_string(),
            });
        }
        let secret = format!("masc_{}", random_hex(32));
        state.enabled = true;
        state.secret_hash = Some(sha256_hex(&secret));
        self.persist(&state)?;
        Ok(secret)
    }

    /// Mint one agent token against the room secret. Shown once.
    pub fn create_token(
        &self,
        secret: &str,
        agent: &str,
        role: Role,
        now_ms: u64,
    ) -> Result<String, Error> {
        let mut state = self.state.lock();
        let Some(hash) = state.secret_hash.as_deref() else {
            return Err(Error::Unauthorized);
        };
        if sha256_hex(secret) != hash {
            return Err(Error::InvalidToken);
        }

        let token = format!("mat_{}", random_hex(32));
        state.tokens.insert(
            agent.to_string(),
            TokenRecord {
                hash: sha256_hex(&token),
                role,
                issued_at_ms: now_ms,
                ttl_secs: self.token_ttl_secs,
            },
        );
        self.persist(&state)?;
        Ok(token)
    }

    /// Resolve the caller's role. With auth disabled there is no
    /// authorization at all; with auth enabled, a tokenless session
    /// defaults to `Worker`.
    pub fn verify(&self, agent: &str, token: Option<&str>, now_ms: u64) -> Result<Role, Error> {
        let state = self.state.lock();
        if !state.enabled {
            return Ok(Role::Admin);
        }
        let Some(token) = token else {
            return Ok(Role::Worker);
        };

        let Some(record) = state.tokens.get(agent) else {
            return Err(Error::InvalidToken);
        };
        if sha256_hex(token) != record.hash {
            return Err(Error::InvalidToken);
        }
        if now_ms.saturating_sub(record.issued_at_ms) >= record.ttl_secs * 1000 {
            return Err(Error::TokenExpired {
                agent: agent.to_string(),
            });
        }
        Ok(record.role)
    }

    /// Drop expired token records. Returns how many were removed.
    pub fn sweep_expired<C: Clock>(&self, clock: &C) -> Result<usize, Error> {
        let now_ms = clock.epoch_ms();
        let mut state = self.state.lock();
        let before = state.tokens.len();
        state
            .tokens
            .retain(|_, t| now_ms.saturating_sub(t.issued_at_ms) < t.ttl_secs * 1000);
        let removed = before - state.tokens.len();
        if removed > 0 {
            self.persist(&state)?;
        }
        Ok(removed)
    }

    fn persist(&self, state: &AuthState) -> Result<(), Error> {
        let bytes = serde_json::to_vec(state).map_err(|e| Error::Internal {
            detail: e.to_string(),
        })?;
        self.backend.put(AUTH_KEY, &bytes).map_err(persist_err)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
