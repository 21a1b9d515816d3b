// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests: a memory-backed room on a fake
//! clock with an inspectable audit sink.

use crate::fabric::EventFabric;
use crate::room::RoomEngine;
use masc_core::{AgentMeta, FakeClock, RoomConfig};
use masc_storage::{MemoryAudit, MemoryBackend};
use std::sync::Arc;

pub(crate) struct TestRoom {
    pub engine: Arc<RoomEngine<FakeClock>>,
    pub clock: FakeClock,
    pub backend: MemoryBackend<FakeClock>,
    pub audit: Arc<MemoryAudit>,
    pub fabric: Arc<EventFabric>,
}

/// An initialized room named "test-room" at a pinned epoch.
pub(crate) fn room() -> TestRoom {
    room_with_config(RoomConfig::default())
}

pub(crate) fn room_with_config(config: RoomConfig) -> TestRoom {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let backend = MemoryBackend::with_clock(clock.clone());
    let audit = Arc::new(MemoryAudit::new());
    let fabric = Arc::new(EventFabric::default());
    let engine = Arc::new(RoomEngine::new(
        Arc::new(backend.clone()),
        audit.clone(),
        Arc::clone(&fabric),
        clock.clone(),
        "/room/base",
        config,
    ));
    engine.init(Some("test-room".to_string())).unwrap();
    TestRoom {
        engine,
        clock,
        backend,
        audit,
        fabric,
    }
}

impl TestRoom {
    /// Join agents with no capabilities.
    pub(crate) fn join_all(&self, names: &[&str]) {
        for name in names {
            self.engine
                .join(name, Vec::new(), AgentMeta::default())
                .unwrap();
        }
    }
}
