// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-bucket rate limiting per session or agent.
//!
//! Buckets are created lazily and pruned when idle. Time comes from the
//! injected clock's monotonic instant, so wall-clock steps cannot grant
//! or destroy tokens.

use masc_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Shared limiter; `rate` tokens/second refill up to `burst` capacity.
/// A non-positive rate disables limiting entirely.
pub struct RateLimiter<C: Clock> {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate: f64,
    burst: f64,
    clock: C,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(rate: f64, burst: f64, clock: C) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate,
            burst: burst.max(1.0),
            clock,
        }
    }

    /// Take one token for `key`. On denial returns the whole seconds to
    /// wait before one token is available.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if self.rate <= 0.0 {
            return Ok(());
        }
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            Err((deficit / self.rate).ceil() as u64)
        }
    }

    /// Drop buckets idle longer than `idle`. Returns how many were removed.
    pub fn prune(&self, idle: Duration) -> usize {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.last) < idle);
        before - buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
