// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event streaming fabric: fingerprint-keyed subscriptions with bounded
//! buffers, one-shot delivery to attached live clients.
//!
//! Lock order is table → subscription → client, never the inverse. No
//! I/O happens under any of these locks; pushes to live clients are
//! non-blocking `try_send`s, and a full or closed channel drops the
//! client rather than stalling the notifier.

use masc_core::{Error, EventType, StreamEvent, SubscriptionId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Maximum events buffered per subscription; oldest is evicted first.
pub const MAX_BUFFERED_EVENTS: usize = 100;

/// Default backpressure cutoff for attached streaming clients.
pub const DEFAULT_MAX_PENDING_SENDS: usize = 100;

struct Subscription {
    agent_filter: Option<String>,
    event_types: BTreeSet<EventType>,
    created_at_ms: u64,
    buffer: VecDeque<StreamEvent>,
}

impl Subscription {
    fn matches(&self, event: &StreamEvent) -> bool {
        let agent_ok = match self.agent_filter.as_deref() {
            None | Some("*") => true,
            Some(filter) => filter == event.agent,
        };
        // An empty type set subscribes to everything.
        let type_ok = self.event_types.is_empty() || self.event_types.contains(&event.event_type);
        agent_ok && type_ok
    }

    fn push(&mut self, event: StreamEvent) {
        if self.buffer.len() >= MAX_BUFFERED_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }
}

/// A live streaming client attached to one subscription.
struct Client {
    tx: mpsc::Sender<serde_json::Value>,
}

/// Shared fan-out hub. One per room.
pub struct EventFabric {
    subs: Mutex<HashMap<SubscriptionId, Arc<Mutex<Subscription>>>>,
    clients: Mutex<HashMap<SubscriptionId, Client>>,
    max_pending_sends: usize,
}

impl Default for EventFabric {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_SENDS)
    }
}

impl EventFabric {
    pub fn new(max_pending_sends: usize) -> Self {
        Self {
            subs: Mutex::new(HashMap::new()),
            clients: Mutex::new(HashMap::new()),
            max_pending_sends: max_pending_sends.max(1),
        }
    }

    /// Register a subscription and return its fresh id.
    pub fn subscribe(
        &self,
        agent_filter: Option<String>,
        event_types: BTreeSet<EventType>,
        now_ms: u64,
    ) -> SubscriptionId {
        let id = SubscriptionId::generate();
        let sub = Subscription {
            agent_filter,
            event_types,
            created_at_ms: now_ms,
            buffer: VecDeque::new(),
        };
        self.subs
            .lock()
            .insert(id.clone(), Arc::new(Mutex::new(sub)));
        id
    }

    /// Drop a subscription, its buffer, and any attached client.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let removed = self.subs.lock().remove(id).is_some();
        self.clients.lock().remove(id);
        removed
    }

    pub fn subscription_count(&self) -> usize {
        self.subs.lock().len()
    }

    /// Deliver one event to every matching subscription.
    pub fn notify(&self, event: &StreamEvent) {
        // Snapshot matching subscriptions under the table lock, then
        // push under each subscription's own lock.
        let targets: Vec<(SubscriptionId, Arc<Mutex<Subscription>>)> = {
            let subs = self.subs.lock();
            subs.iter()
                .map(|(id, sub)| (id.clone(), Arc::clone(sub)))
                .collect()
        };

        let mut dead_clients = Vec::new();
        for (id, sub) in targets {
            let matched = {
                let mut sub = sub.lock();
                if !sub.matches(event) {
                    false
                } else {
                    sub.push(event.clone());
                    true
                }
            };
            if !matched {
                continue;
            }

            let clients = self.clients.lock();
            if let Some(client) = clients.get(&id) {
                let envelope = envelope(event, &id);
                if client.tx.try_send(envelope).is_err() {
                    // Full (backpressure) or closed: the client is unhealthy.
                    dead_clients.push(id.clone());
                }
            }
        }

        if !dead_clients.is_empty() {
            let mut clients = self.clients.lock();
            for id in dead_clients {
                tracing::debug!(subscription = %id, "dropping unhealthy streaming client");
                clients.remove(&id);
            }
        }
    }

    /// Return buffered events; `clear` resets the buffer.
    pub fn poll_events(
        &self,
        id: &SubscriptionId,
        clear: bool,
    ) -> Result<Vec<StreamEvent>, Error> {
        let sub = self
            .subs
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SubscriptionNotFound { id: id.to_string() })?;
        let mut sub = sub.lock();
        if clear {
            Ok(sub.buffer.drain(..).collect())
        } else {
            Ok(sub.buffer.iter().cloned().collect())
        }
    }

    /// Attach a live channel to a subscription. The returned receiver
    /// yields ready-to-write JSON-RPC notification values.
    pub fn attach_client(
        &self,
        id: &SubscriptionId,
    ) -> Result<mpsc::Receiver<serde_json::Value>, Error> {
        if !self.subs.lock().contains_key(id) {
            return Err(Error::SubscriptionNotFound { id: id.to_string() });
        }
        let (tx, rx) = mpsc::channel(self.max_pending_sends);
        self.clients.lock().insert(id.clone(), Client { tx });
        Ok(rx)
    }

    pub fn detach_client(&self, id: &SubscriptionId) -> bool {
        self.clients.lock().remove(id).is_some()
    }

    /// Age-ordered subscription ids, for diagnostics.
    pub fn subscriptions(&self) -> Vec<(SubscriptionId, u64)> {
        let subs = self.subs.lock();
        let mut out: Vec<(SubscriptionId, u64)> = subs
            .iter()
            .map(|(id, sub)| (id.clone(), sub.lock().created_at_ms))
            .collect();
        out.sort_by_key(|(_, at)| *at);
        out
    }
}

/// JSON-RPC notification envelope pushed to streaming clients.
pub fn envelope(event: &StreamEvent, subscription_id: &SubscriptionId) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "method": "masc/event",
        "params": {
            "type": event.event_type.as_str(),
            "agent": event.agent,
            "data": event.data,
            "timestamp": event.timestamp,
            "subscription_id": subscription_id.as_str(),
        }
    })
}

#[cfg(test)]
#[path = "fabric_tests.rs"]
mod tests;
