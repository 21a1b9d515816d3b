// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Accepts unix-socket connections and serves one request/reply pair
//! per connection. Command execution is synchronous engine work, so it
//! runs on the blocking pool; the accept loop never stalls on a slow
//! command.

use crate::gate::Gate;
use crate::protocol::{self, DEFAULT_TIMEOUT};
use masc_core::Clock;
use masc_engine::Shutdown;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Dispatch task failed: {0}")]
    Dispatch(String),
}

/// Listener task for accepting socket connections.
pub struct Listener<C: Clock> {
    socket: UnixListener,
    gate: Arc<Gate<C>>,
    shutdown: Arc<Shutdown>,
}

impl<C: Clock> Listener<C> {
    pub fn new(socket: UnixListener, gate: Arc<Gate<C>>, shutdown: Arc<Shutdown>) -> Self {
        Self {
            socket,
            gate,
            shutdown,
        }
    }

    /// Accept connections until shutdown, one spawned task per client.
    pub async fn run(self) {
        loop {
            tokio::select! {
                accepted = self.socket.accept() => match accepted {
                    Ok((stream, _)) => {
                        let gate = Arc::clone(&self.gate);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, gate).await {
                                match e {
                                    ConnectionError::Protocol(
                                        protocol::ProtocolError::ConnectionClosed,
                                    ) => debug!("Client disconnected"),
                                    ConnectionError::Protocol(
                                        protocol::ProtocolError::Timeout,
                                    ) => warn!("Connection timeout"),
                                    _ => error!("Connection error: {}", e),
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                },
                _ = self.shutdown.wait() => {
                    debug!("Listener shutting down");
                    return;
                }
            }
        }
    }
}

/// Handle a single client connection: one request, one reply.
async fn handle_connection<C: Clock>(
    stream: UnixStream,
    gate: Arc<Gate<C>>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(command = ?request.command, "received request");

    // Engine work is blocking; keep it off the reactor threads.
    let reply = tokio::task::spawn_blocking(move || gate.dispatch(request))
        .await
        .map_err(|e| ConnectionError::Dispatch(e.to_string()))?;

    protocol::write_reply(&mut writer, &reply, DEFAULT_TIMEOUT).await?;
    Ok(())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
