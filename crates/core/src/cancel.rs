// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot cancellation tokens with attached cleanup callbacks.
//!
//! A token flips `cancelled` from false to true exactly once. Callbacks
//! registered before cancellation run exactly once, outside the token
//! lock; callbacks registered after cancellation run immediately.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Callback = Box<dyn FnOnce() + Send>;

struct TokenInner {
    cancelled: bool,
    reason: Option<String>,
    callbacks: Vec<Callback>,
}

/// A one-shot cancellation flag shared between the issuer and the
/// operation it can abort.
#[derive(Clone)]
pub struct CancellationToken {
    id: String,
    created_at_ms: u64,
    inner: Arc<Mutex<TokenInner>>,
}

impl CancellationToken {
    pub fn new(id: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id: id.into(),
            created_at_ms,
            inner: Arc::new(Mutex::new(TokenInner {
                cancelled: false,
                reason: None,
                callbacks: Vec::new(),
            })),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    pub fn reason(&self) -> Option<String> {
        self.inner.lock().reason.clone()
    }

    /// Cancel the token. The first call wins; later calls are no-ops.
    /// Registered callbacks are drained under the lock and run after it
    /// is released, so a callback may safely touch the token.
    pub fn cancel(&self, reason: impl Into<String>) {
        let callbacks = {
            let mut inner = self.inner.lock();
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
            inner.reason = Some(reason.into());
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Register a cleanup callback. If the token is already cancelled
    /// the callback runs immediately on the caller's thread.
    pub fn on_cancel(&self, callback: impl FnOnce() + Send + 'static) {
        let mut inner = self.inner.lock();
        if inner.cancelled {
            drop(inner);
            callback();
        } else {
            inner.callbacks.push(Box::new(callback));
        }
    }
}

/// In-memory registry of live tokens, swept by the token GC supervisor.
#[derive(Default)]
pub struct TokenStore {
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint and register a token.
    pub fn create(&self, id: impl Into<String>, now_ms: u64) -> CancellationToken {
        let token = CancellationToken::new(id, now_ms);
        self.tokens
            .lock()
            .insert(token.id().to_string(), token.clone());
        token
    }

    pub fn get(&self, id: &str) -> Option<CancellationToken> {
        self.tokens.lock().get(id).cloned()
    }

    /// Cancel a registered token by id. Returns false for unknown ids.
    pub fn cancel(&self, id: &str, reason: &str) -> bool {
        let token = self.tokens.lock().get(id).cloned();
        match token {
            Some(token) => {
                token.cancel(reason);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.tokens.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }

    /// Cancel every registered token, e.g. at shutdown.
    pub fn cancel_all(&self, reason: &str) {
        let tokens: Vec<CancellationToken> = self.tokens.lock().values().cloned().collect();
        for token in tokens {
            token.cancel(reason);
        }
    }

    /// Drop tokens older than `max_age_ms`. Returns how many were removed.
    pub fn sweep(&self, now_ms: u64, max_age_ms: u64) -> usize {
        let mut tokens = self.tokens.lock();
        let before = tokens.len();
        tokens.retain(|_, t| now_ms.saturating_sub(t.created_at_ms()) < max_age_ms);
        before - tokens.len()
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
