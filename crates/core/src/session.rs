// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport session identifiers.
//!
//! HTTP/WebSocket adapters echo a server-assigned session id; the gate
//! maps it to an agent name. Ids are visible ASCII so they survive any
//! header encoding.

use crate::clock::Clock;

crate::define_id! {
    /// Server-assigned transport session identifier.
    pub struct SessionId;
}

/// Prefix for generated session ids.
pub const SESSION_PREFIX: &str = "mcp_";

const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

fn base62(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(BASE62[(n % 62) as usize]);
        n /= 62;
    }
    buf.reverse();
    // BASE62 is pure ASCII
    String::from_utf8(buf).unwrap_or_default()
}

/// Generate a fresh session id: `mcp_` + base62(timestamp, pid, random).
pub fn generate_session_id<C: Clock>(clock: &C) -> SessionId {
    use rand::Rng;
    let mut rng = rand::rng();
    let nonce: u64 = rng.random();
    SessionId::new(format!(
        "{}{}{}{}",
        SESSION_PREFIX,
        base62(clock.epoch_ms()),
        base62(std::process::id() as u64),
        base62(nonce),
    ))
}

/// A session id is valid when non-empty, bounded, and visible ASCII
/// (0x21–0x7E). Anything else gets replaced with a fresh id.
pub fn validate_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.bytes().all(|b| (0x21..=0x7E).contains(&b))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
