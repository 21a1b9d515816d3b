// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portals: open, cooperative send with deadline, close.
//!
//! `portal_send` parks on a condvar until a portal involving the sender
//! exists, the deadline passes, or the caller's cancellation token
//! fires. The wait re-checks at a bounded interval so a fake clock can
//! drive timeouts in tests.

use crate::room::{keys, store_err, RoomEngine};
use masc_core::{CancellationToken, Clock, Error, Portal};
use std::time::Duration;

/// Upper bound on one condvar park, so deadline checks stay responsive.
const PORTAL_POLL: Duration = Duration::from_millis(50);

impl<C: Clock> RoomEngine<C> {
    /// Open a portal from `owner` to `peer`. One open portal per owner.
    pub fn portal_open(&self, owner: &str, peer: &str) -> Result<Portal, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(owner)?;
        self.require_active_agent(peer)?;
        if owner == peer {
            return Err(Error::Schema {
                detail: "a portal needs two distinct endpoints".to_string(),
            });
        }
        if self.get_json::<Portal>(&keys::portal(owner))?.is_some() {
            return Err(Error::PortalBusy {
                agent: owner.to_string(),
            });
        }

        let portal = Portal::new(owner, peer, self.clock.now_utc());
        self.put_json(&keys::portal(owner), &portal)?;
        self.wake_portal_waiters();
        Ok(portal)
    }

    /// Send into whichever open portal involves `from`, waiting up to
    /// `timeout` for one to appear.
    pub fn portal_send(
        &self,
        from: &str,
        content: &str,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), Error> {
        self.room()?;
        self.require_active_agent(from)?;

        let deadline = self.clock.now() + timeout;
        loop {
            if let Some((key, mut portal)) = self.find_portal_involving(from)? {
                portal.push(from, content, self.clock.now_utc());
                self.put_json(&key, &portal)?;
                let other = if portal.owner == from {
                    portal.peer.clone()
                } else {
                    portal.owner.clone()
                };
                let _ = self.portal_message(from, &other, content);
                self.wake_portal_waiters();
                return Ok(());
            }

            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(Error::Cancelled {
                        reason: token.reason().unwrap_or_default(),
                    });
                }
            }
            if self.clock.now() >= deadline {
                return Err(Error::Timeout);
            }

            let mut guard = self.portal_signal.mutex.lock();
            self.portal_signal
                .cond
                .wait_for(&mut guard, PORTAL_POLL);
        }
    }

    /// Close the portal owned by `owner`.
    pub fn portal_close(&self, owner: &str) -> Result<(), Error> {
        self.room()?;
        self.require_active_agent(owner)?;
        let key = keys::portal(owner);
        let existed = self.backend.delete(&key).map_err(store_err)?;
        if !existed {
            return Err(Error::PortalNotOpen {
                agent: owner.to_string(),
            });
        }
        self.wake_portal_waiters();
        Ok(())
    }

    /// The open portal involving `agent`, if any.
    pub fn portal_status(&self, agent: &str) -> Result<Option<Portal>, Error> {
        self.room()?;
        Ok(self.find_portal_involving(agent)?.map(|(_, p)| p))
    }

    fn find_portal_involving(&self, agent: &str) -> Result<Option<(String, Portal)>, Error> {
        // Own portal first, then scan for portals peering at us.
        let own_key = keys::portal(agent);
        if let Some(portal) = self.get_json::<Portal>(&own_key)? {
            return Ok(Some((own_key, portal)));
        }
        for key in self.backend.list(keys::PORTALS).map_err(store_err)? {
            if let Some(portal) = self.get_json::<Portal>(&key)? {
                if portal.peer == agent {
                    return Ok(Some((key, portal)));
                }
            }
        }
        Ok(None)
    }

    pub(crate) fn wake_portal_waiters(&self) {
        let _guard = self.portal_signal.mutex.lock();
        self.portal_signal.cond.notify_all();
    }
}

#[cfg(test)]
#[path = "portals_tests.rs"]
mod tests;
