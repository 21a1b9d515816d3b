// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MASC room daemon (mascd)
//!
//! Long-running process that owns one room: the session & auth gate,
//! the state engine, the streaming fabric, and the GC supervisors. It
//! listens on a unix socket under `<base_path>/.masc/`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use masc_daemon::lifecycle::{self, DaemonConfig, LifecycleError};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut base_path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("mascd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("mascd {VERSION}");
                println!("MASC room daemon - coordination server for agent workspaces");
                println!();
                println!("USAGE:");
                println!("    mascd [BASE_PATH]");
                println!();
                println!("Serves the room rooted at BASE_PATH (default: current directory)");
                println!("on the unix socket <BASE_PATH>/.masc/daemon.sock. The daemon is");
                println!("typically started by the `masc` CLI.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -V, --version    Print version information");
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                eprintln!("error: unexpected argument '{flag}'");
                eprintln!("Usage: mascd [BASE_PATH]");
                std::process::exit(1);
            }
            path => {
                if base_path.replace(PathBuf::from(path)).is_some() {
                    eprintln!("error: more than one BASE_PATH given");
                    std::process::exit(1);
                }
            }
        }
    }

    let base_path = match base_path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let config = DaemonConfig::load(base_path);

    let _log_guard = setup_logging(&config)?;
    info!(base = %config.base_path.display(), "starting room daemon");

    let daemon = match lifecycle::startup(config).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed) => {
            eprintln!("mascd is already running for this room");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Signal ready for a parent process waiting on startup
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = daemon.wait_for_shutdown() => info!("shutdown requested via command"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    daemon.shutdown().await?;
    Ok(())
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
