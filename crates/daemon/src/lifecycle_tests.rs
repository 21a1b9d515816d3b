// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{encode, read_message, Command, Reply, Request, Response};
use masc_core::BackendKind;
use tokio::net::UnixStream;

fn memory_config(dir: &tempfile::TempDir) -> DaemonConfig {
    let mut config = DaemonConfig::load(dir.path());
    config.room.backend = BackendKind::Memory;
    config.room.rate = 0.0;
    config
}

async fn send(socket_path: &Path, request: &Request) -> Reply {
    let stream = UnixStream::connect(socket_path).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    crate::protocol::write_message(&mut writer, &encode(request).unwrap())
        .await
        .unwrap();
    let bytes = read_message(&mut reader).await.unwrap();
    crate::protocol::decode(&bytes).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn startup_serves_and_shuts_down_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = memory_config(&dir);
    let socket_path = config.socket_path();

    let daemon = startup(config).await.unwrap();
    assert!(socket_path.exists());

    let reply = send(&socket_path, &Request::bare(Command::Status)).await;
    assert!(matches!(reply.response, Response::Status { .. }));

    // Shutdown via command, then drain
    let reply = send(&socket_path, &Request::bare(Command::Shutdown)).await;
    assert_eq!(reply.response, Response::ShuttingDown);
    daemon.wait_for_shutdown().await;
    daemon.shutdown().await.unwrap();
    assert!(!socket_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_daemon_is_refused_by_the_pid_lock() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = startup(memory_config(&dir)).await.unwrap();

    match startup(memory_config(&dir)).await {
        Err(LifecycleError::LockFailed) => {}
        other => panic!("expected LockFailed, got {other:?}"),
    }

    daemon.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_backend_persists_state_across_daemons() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DaemonConfig::load(dir.path());
    config.room.rate = 0.0;
    let socket_path = config.socket_path();

    {
        let daemon = startup(config.clone()).await.unwrap();
        let reply = send(
            &socket_path,
            &Request::bare(Command::Join {
                agent: "a1".into(),
                capabilities: Vec::new(),
                meta: Default::default(),
            }),
        )
        .await;
        assert!(matches!(reply.response, Response::Agent { .. }));
        daemon.shutdown().await.unwrap();
    }

    // A new daemon over the same base path sees the joined agent
    let daemon = startup(config).await.unwrap();
    let reply = send(&socket_path, &Request::bare(Command::Agents)).await;
    match reply.response {
        Response::Agents { agents } => {
            assert_eq!(agents.len(), 1);
            assert_eq!(agents[0].name, "a1");
        }
        other => panic!("unexpected: {other:?}"),
    }
    daemon.shutdown().await.unwrap();
}

#[test]
fn config_paths_live_under_the_masc_dir() {
    let config = DaemonConfig::load("/some/base");
    assert_eq!(
        config.socket_path(),
        PathBuf::from("/some/base/.masc/daemon.sock")
    );
    assert_eq!(
        config.pid_path(),
        PathBuf::from("/some/base/.masc/daemon.pid")
    );
    assert_eq!(config.log_dir(), PathBuf::from("/some/base/.masc/logs"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_socket_file_is_replaced_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = memory_config(&dir);
    std::fs::create_dir_all(config.root()).unwrap();
    std::fs::write(config.socket_path(), b"stale").unwrap();

    let daemon = startup(config.clone()).await.unwrap();
    let reply = send(&config.socket_path(), &Request::bare(Command::Ping)).await;
    assert_eq!(reply.response, Response::Pong);
    daemon.shutdown().await.unwrap();
}
