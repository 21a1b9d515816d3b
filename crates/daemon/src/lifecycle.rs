// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and drain-first shutdown.
//!
//! Startup: take the pid lock (one daemon per room), build the backend
//! chosen by config, wire engine + fabric + walph + gate, spawn the GC
//! supervisors and the listener. Shutdown: stop accepting, finish
//! in-flight commands, stop and join walph loops, cancel outstanding
//! tokens, then let the supervisors exit.

use crate::auth::AuthStore;
use crate::gate::Gate;
use crate::listener::Listener;
use fs2::FileExt;
use masc_adapters::NoOpExecutor;
use masc_core::{BackendKind, Error as CoreError, RoomConfig, SystemClock, TokenStore};
use masc_engine::{EventFabric, GcConfig, RoomEngine, Shutdown, Supervisors, WalphSupervisor};
use masc_storage::{
    masc_root, AuditSink, FileAudit, FileBackend, MemoryAudit, MemoryBackend, SqliteBackend,
    StorageBackend, StorageError,
};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Errors that can occur during daemon lifecycle
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("another daemon already serves this room")]
    LockFailed,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("engine error: {0}")]
    Engine(#[from] CoreError),
}

/// How long gate-side transient state (buckets, sessions) may idle
/// before the housekeeping loop drops it.
const TRANSIENT_IDLE: std::time::Duration = std::time::Duration::from_secs(3600);

/// Resolved daemon configuration for one room.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub base_path: PathBuf,
    pub room: RoomConfig,
}

impl DaemonConfig {
    pub fn load(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let room = RoomConfig::load(&base_path);
        Self { base_path, room }
    }

    pub fn root(&self) -> PathBuf {
        masc_root(&self.base_path)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.root().join("daemon.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root().join("daemon.pid")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root().join("logs")
    }
}

/// A running daemon: gate, supervisors, listener, pid lock.
pub struct Daemon {
    pub gate: Arc<Gate<SystemClock>>,
    pub shutdown: Arc<Shutdown>,
    config: DaemonConfig,
    walph: Arc<WalphSupervisor<SystemClock>>,
    cancel_tokens: Arc<TokenStore>,
    supervisors: Supervisors,
    listener_handle: JoinHandle<()>,
    housekeeping_handle: JoinHandle<()>,
    pid_lock: File,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon").finish_non_exhaustive()
    }
}

/// Build the configured storage backend.
fn open_backend(config: &DaemonConfig) -> Result<Arc<dyn StorageBackend>, LifecycleError> {
    let root = config.root();
    Ok(match config.room.backend {
        BackendKind::File => Arc::new(FileBackend::open(&root, config.room.secure_mode)?),
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(&root.join("room.db"))?),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    })
}

fn open_audit(config: &DaemonConfig) -> Result<Arc<dyn AuditSink>, LifecycleError> {
    Ok(match config.room.backend {
        BackendKind::Memory => Arc::new(MemoryAudit::new()),
        _ => Arc::new(FileAudit::open(&config.root())?),
    })
}

/// Take the exclusive pid lock for this room, writing our pid into it.
fn acquire_pid_lock(path: &Path) -> Result<File, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Start a daemon for the room at `config.base_path`.
pub async fn startup(config: DaemonConfig) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(config.root())?;
    let pid_lock = acquire_pid_lock(&config.pid_path())?;

    let backend = open_backend(&config)?;
    let audit = open_audit(&config)?;
    let clock = SystemClock::new();
    let fabric = Arc::new(EventFabric::new(config.room.max_pending_sends));

    let engine = Arc::new(RoomEngine::new(
        Arc::clone(&backend),
        audit,
        Arc::clone(&fabric),
        clock,
        config.base_path.clone(),
        config.room.clone(),
    ));
    engine.init(config.room.project_name.clone())?;

    let walph = Arc::new(WalphSupervisor::new(
        Arc::clone(&engine),
        Arc::new(NoOpExecutor),
    ));
    let auth = if config.room.auth_enabled {
        AuthStore::load_enabled(Arc::clone(&backend), config.room.token_ttl_secs)
    } else {
        AuthStore::load(Arc::clone(&backend), config.room.token_ttl_secs)
    };

    let cancel_tokens = Arc::new(TokenStore::new());
    let shutdown = Arc::new(Shutdown::new());
    let gate = Arc::new(Gate::new(
        Arc::clone(&engine),
        Arc::clone(&walph),
        auth,
        Arc::clone(&cancel_tokens),
        Arc::clone(&shutdown),
    ));

    let supervisors = Supervisors::spawn(
        Arc::clone(&engine),
        Arc::clone(&cancel_tokens),
        GcConfig::from_room(&config.room),
        Arc::clone(&shutdown),
    );

    // A stale socket file from a crashed daemon blocks bind; the pid
    // lock already proved no one is serving it.
    let socket_path = config.socket_path();
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let socket = UnixListener::bind(&socket_path)?;
    let listener = Listener::new(socket, Arc::clone(&gate), Arc::clone(&shutdown));
    let listener_handle = tokio::spawn(listener.run());

    // Housekeeping for gate-side transient state (rate buckets, idle
    // sessions, expired tokens).
    let housekeeping_handle = {
        let gate = Arc::clone(&gate);
        let shutdown = Arc::clone(&shutdown);
        let interval = std::time::Duration::from_secs(config.room.cleanup_interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.wait() => return,
                }
                gate.prune_transients(TRANSIENT_IDLE);
            }
        })
    };

    info!(socket = %socket_path.display(), "daemon ready");
    Ok(Daemon {
        gate,
        shutdown,
        config,
        walph,
        cancel_tokens,
        supervisors,
        listener_handle,
        housekeeping_handle,
        pid_lock,
    })
}

impl Daemon {
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Block until shutdown is requested (command or signal).
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.wait().await;
    }

    /// Drain-first shutdown: listener first, walph loops joined, tokens
    /// cancelled, supervisors last.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        self.shutdown.trigger();
        let _ = self.listener_handle.await;
        let _ = self.housekeeping_handle.await;

        // Walph loops park on condvars; join them off the reactor.
        let walph = Arc::clone(&self.walph);
        let _ = tokio::task::spawn_blocking(move || walph.drain()).await;

        self.cancel_tokens.cancel_all("daemon shutdown");
        self.supervisors.join().await;

        let socket_path = self.config.socket_path();
        if socket_path.exists() {
            let _ = std::fs::remove_file(&socket_path);
        }
        let _ = FileExt::unlock(&self.pid_lock);
        info!("daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
