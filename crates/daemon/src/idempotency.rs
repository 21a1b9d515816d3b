// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency cache for create commands.
//!
//! Adapters that need safe retries send a client-generated key; the
//! gate replays the cached response for re-posts within the window.
//! Bounded LRU, in-memory only.

use crate::protocol::Response;
use lru::LruCache;
use masc_core::Clock;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;

const CACHE_CAPACITY: usize = 1024;

pub struct IdempotencyCache<C: Clock> {
    clock: C,
    window_ms: u64,
    inner: Mutex<LruCache<String, (Response, u64)>>,
}

impl<C: Clock> IdempotencyCache<C> {
    pub fn new(window: Duration, clock: C) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            clock,
            window_ms: window.as_millis() as u64,
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached response for `key`, if still inside the window.
    pub fn get(&self, key: &str) -> Option<Response> {
        let now_ms = self.clock.epoch_ms();
        let mut cache = self.inner.lock();
        match cache.get(key) {
            Some((response, at_ms)) if now_ms.saturating_sub(*at_ms) < self.window_ms => {
                Some(response.clone())
            }
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, response: Response) {
        let now_ms = self.clock.epoch_ms();
        self.inner
            .lock()
            .put(key.to_string(), (response, now_ms));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
