// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque pagination cursors.
//!
//! A cursor encodes `(kind, last_position)` so a client cannot replay a
//! messages cursor against the task list. The encoding is base64 over a
//! versioned plain-text form; opacity is a forgery deterrent, not a
//! secrecy boundary.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use masc_core::Error;

const CURSOR_VERSION: &str = "masc1";

/// Which collection a cursor paginates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Messages,
    Tasks,
    Votes,
}

impl CursorKind {
    fn as_str(&self) -> &'static str {
        match self {
            CursorKind::Messages => "messages",
            CursorKind::Tasks => "tasks",
            CursorKind::Votes => "votes",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "messages" => Some(CursorKind::Messages),
            "tasks" => Some(CursorKind::Tasks),
            "votes" => Some(CursorKind::Votes),
            _ => None,
        }
    }
}

/// Position within one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub kind: CursorKind,
    pub last: u64,
}

impl Cursor {
    pub fn new(kind: CursorKind, last: u64) -> Self {
        Self { kind, last }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{CURSOR_VERSION}:{}:{}", self.kind.as_str(), self.last))
    }

    /// Decode and check the cursor targets the expected collection.
    pub fn decode(encoded: &str, expected: CursorKind) -> Result<Self, Error> {
        let invalid = || Error::Schema {
            detail: format!("invalid cursor: {encoded:?}"),
        };

        let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;

        let mut parts = text.splitn(3, ':');
        let version = parts.next().ok_or_else(invalid)?;
        let kind = parts.next().and_then(CursorKind::parse).ok_or_else(invalid)?;
        let last: u64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;

        if version != CURSOR_VERSION {
            return Err(invalid());
        }
        if kind != expected {
            return Err(Error::Schema {
                detail: format!(
                    "cursor targets {}, expected {}",
                    kind.as_str(),
                    expected.as_str()
                ),
            });
        }
        Ok(Cursor { kind, last })
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
