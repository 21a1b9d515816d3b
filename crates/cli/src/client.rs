// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for talking to a running `mascd`.

use anyhow::{Context, Result};
use masc_daemon::protocol::{self, Reply, Request, DEFAULT_TIMEOUT};
use std::path::Path;
use tokio::net::UnixStream;

/// Send one request to the room daemon and await its reply.
pub async fn call(base_path: &Path, request: &Request) -> Result<Reply> {
    let socket_path = base_path.join(".masc").join("daemon.sock");
    let stream = UnixStream::connect(&socket_path).await.with_context(|| {
        format!(
            "cannot reach the room daemon at {} (is mascd running?)",
            socket_path.display()
        )
    })?;
    let (mut reader, mut writer) = stream.into_split();

    let data = protocol::encode(request).context("encode request")?;
    protocol::write_message(&mut writer, &data)
        .await
        .context("send request")?;

    let bytes = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut reader))
        .await
        .context("daemon did not reply in time")?
        .context("read reply")?;
    let reply: Reply = protocol::decode(&bytes).context("decode reply")?;
    Ok(reply)
}
