// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locks held by agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An advisory lock on a path under the room's base directory.
///
/// Locks are self-owned: only the owner may release one. Expiry is
/// enforced on read (expired = free) even before the sweeper runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLock {
    /// Normalized path relative to `base_path`
    pub resource: String,
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileLock {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Escape a resource path into a flat file name.
///
/// Alphanumerics plus `. - _` pass through; everything else (notably `/`)
/// is percent-encoded so the escape is reversible and collision-free.
pub fn escape_resource(resource: &str) -> String {
    let mut out = String::with_capacity(resource.len());
    for b in resource.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' => out.push(b as char),
            other => {
                out.push('%');
                out.push_str(&format!("{other:02X}"));
            }
        }
    }
    out
}

/// Inverse of [`escape_resource`]. Malformed escapes pass through verbatim.
pub fn unescape_resource(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = escaped.get(i + 1..i + 3);
            if let Some(decoded) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(decoded);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
