// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background supervisors: zombie agent GC, lock TTL sweeper,
//! cancellation token GC.
//!
//! Each loop ticks on a shared interval, backs off exponentially on
//! backend errors, and drains its in-flight sweep before honoring
//! shutdown.

use crate::room::RoomEngine;
use chrono::Duration as ChronoDuration;
use masc_core::{AgentStatus, Clock, Error, TokenStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Latched shutdown signal: once triggered, stays triggered. Waiters
/// that were busy when the trigger fired observe it on their next check
/// instead of sleeping forever on a missed notification.
#[derive(Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once triggered, with no lost-wakeup window.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        let _ = notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// Supervisor timing knobs, usually derived from `RoomConfig`.
#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    pub cleanup_interval: Duration,
    pub zombie_threshold: Duration,
    pub token_max_age: Duration,
}

impl GcConfig {
    pub fn from_room(config: &masc_core::RoomConfig) -> Self {
        Self {
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs),
            zombie_threshold: Duration::from_secs(config.zombie_threshold_secs),
            token_max_age: Duration::from_secs(config.token_max_age_secs),
        }
    }
}

/// Handles for the three running GC loops.
pub struct Supervisors {
    handles: Vec<JoinHandle<()>>,
}

impl Supervisors {
    /// Spawn the three loops onto the current tokio runtime.
    pub fn spawn<C: Clock>(
        engine: Arc<RoomEngine<C>>,
        tokens: Arc<TokenStore>,
        config: GcConfig,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        let zombie = {
            let engine = Arc::clone(&engine);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(run_loop("zombie-gc", config.cleanup_interval, shutdown, move || {
                engine.sweep_zombies(config.zombie_threshold).map(|evicted| {
                    if !evicted.is_empty() {
                        tracing::info!(?evicted, "zombie agents deactivated");
                    }
                })
            }))
        };

        let locks = {
            let engine = Arc::clone(&engine);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(run_loop("lock-gc", config.cleanup_interval, shutdown, move || {
                engine.sweep_expired_locks().map(|evicted| {
                    if evicted > 0 {
                        tracing::debug!(evicted, "expired locks swept");
                    }
                })
            }))
        };

        let token_gc = {
            let clock = engine.clock().clone();
            let shutdown = Arc::clone(&shutdown);
            let max_age_ms = config.token_max_age.as_millis() as u64;
            tokio::spawn(run_loop("token-gc", config.cleanup_interval, shutdown, move || {
                let removed = tokens.sweep(clock.epoch_ms(), max_age_ms);
                if removed > 0 {
                    tracing::debug!(removed, "stale cancellation tokens dropped");
                }
                Ok(())
            }))
        };

        Self {
            handles: vec![zombie, locks, token_gc],
        }
    }

    /// Wait for every loop to observe shutdown and exit.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Shared loop shape: tick, sweep, back off on error, exit on shutdown.
async fn run_loop<F>(name: &'static str, interval: Duration, shutdown: Arc<Shutdown>, mut sweep: F)
where
    F: FnMut() -> Result<(), Error> + Send + 'static,
{
    let mut consecutive_errors: u32 = 0;
    loop {
        let delay = backoff_delay(interval, consecutive_errors);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.wait() => {
                tracing::debug!(supervisor = name, "shutdown");
                return;
            }
        }

        // The sweep itself is not interruptible: an in-flight pass
        // always finishes before the next shutdown check.
        match sweep() {
            Ok(()) => consecutive_errors = 0,
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                tracing::warn!(supervisor = name, error = %e, consecutive_errors, "sweep failed");
            }
        }
        if shutdown.is_triggered() {
            tracing::debug!(supervisor = name, "shutdown after sweep");
            return;
        }
    }
}

/// Exponential backoff on top of the base interval, capped at 8x.
fn backoff_delay(interval: Duration, consecutive_errors: u32) -> Duration {
    let factor = 1u32 << consecutive_errors.min(3);
    interval.saturating_mul(factor)
}

impl<C: Clock> RoomEngine<C> {
    /// Deactivate agents whose `last_seen` is older than `threshold`:
    /// locks released, claims reverted, record kept as `inactive`.
    pub fn sweep_zombies(&self, threshold: Duration) -> Result<Vec<String>, Error> {
        let now = self.clock.now_utc();
        let cutoff = ChronoDuration::from_std(threshold).unwrap_or(ChronoDuration::MAX);

        let mut evicted = Vec::new();
        for agent in self.get_agents()? {
            if agent.status == AgentStatus::Inactive {
                continue;
            }
            if now.signed_duration_since(agent.last_seen) <= cutoff {
                continue;
            }
            self.deactivate_agent(&agent.name, "zombie")?;
            evicted.push(agent.name);
        }
        Ok(evicted)
    }
}

#[cfg(test)]
#[path = "gc_tests.rs"]
mod tests;
