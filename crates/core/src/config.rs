// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room configuration, loaded from `<base_path>/.masc/config.toml`.
//!
//! Missing or malformed config falls back to defaults; the room must be
//! able to start from a bare directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which storage backend the room persists through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
    /// Ephemeral, for tests and throwaway rooms
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Defaults to the base directory name when unset
    pub project_name: Option<String>,
    pub backend: BackendKind,

    /// Supervisor tick interval
    pub cleanup_interval_secs: u64,
    /// Agents silent longer than this are treated as zombies
    pub zombie_threshold_secs: u64,
    /// Cancellation tokens older than this are garbage collected
    pub token_max_age_secs: u64,

    /// Token-bucket refill per second
    pub rate: f64,
    /// Token-bucket capacity
    pub burst: f64,

    pub auth_enabled: bool,
    pub token_ttl_secs: u64,

    /// Streaming client backpressure cutoff
    pub max_pending_sends: usize,
    /// How long a cached idempotent response stays valid
    pub idempotency_window_secs: u64,
    /// Deadline applied to delegate-style operations with no explicit timeout
    pub default_deadline_secs: u64,

    /// When set, room directories are created 0700 instead of 0755
    pub secure_mode: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            backend: BackendKind::File,
            cleanup_interval_secs: 60,
            zombie_threshold_secs: 300,
            token_max_age_secs: 3600,
            rate: 5.0,
            burst: 10.0,
            auth_enabled: false,
            token_ttl_secs: 86_400,
            max_pending_sends: 100,
            idempotency_window_secs: 600,
            default_deadline_secs: 300,
            secure_mode: false,
        }
    }
}

impl RoomConfig {
    /// Load config for a room, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load(base_path: &Path) -> Self {
        let path = base_path.join(".masc").join("config.toml");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&contents).unwrap_or_default()
    }

    /// Project name, defaulting to the base directory name.
    pub fn project_name_or(&self, base_path: &Path) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }
        base_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("room")
            .to_string()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
