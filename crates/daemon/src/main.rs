// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fld: the Flowline orchestrator daemon.
//!
//! Default mode serves the client socket (Unix, plus TCP when
//! `FL_TCP_PORT` is set). `--slave` serves the slave execute surface on
//! `FL_SLAVE_PORT` instead.

use fl_core::SystemClock;
use fl_daemon::env;
use fl_daemon::listener::{ListenCtx, Listener};
use fl_daemon::orchestrator::Orchestrator;
use fl_daemon::slave::{SlaveInfo, SlaveServer, SlaveState};
use fl_engine::{Engine, HandlerRegistry};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let slave_mode = std::env::args().any(|a| a == "--slave");

    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(state_dir.join("logs"))?;

    // One daemon per state directory
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(state_dir.join("fld.lock"))?;
    if lock_file.try_lock_exclusive().is_err() {
        return Err("another fld instance holds the state directory".into());
    }

    let appender = tracing_appender::rolling::daily(state_dir.join("logs"), "fld.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FL_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let config = fl_daemon::OrchestratorConfig::from_env();
    let engine = Arc::new(Engine::new(HandlerRegistry::builtin()));
    let orchestrator = Arc::new(Orchestrator::new(Some(engine), config, SystemClock));
    register_slaves_from_env(&orchestrator);

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                shutdown.notify_waiters();
            }
        });
    }

    if slave_mode {
        let port = env::slave_port();
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!(port, version = env::PROTOCOL_VERSION, "slave host listening");
        let server = Arc::new(SlaveServer::new(orchestrator, shutdown, SystemClock));
        server.run(listener).await;
    } else {
        let socket_path = env::socket_path()?;
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _ = std::fs::remove_file(&socket_path);
        let unix = UnixListener::bind(&socket_path)?;
        tracing::info!(socket = %socket_path.display(), version = env::PROTOCOL_VERSION, "daemon listening");

        let ctx = Arc::new(ListenCtx { orchestrator, shutdown });
        let listener = match env::tcp_port() {
            Some(port) => {
                let tcp = TcpListener::bind(("0.0.0.0", port)).await?;
                tracing::info!(port, "tcp listener enabled");
                Listener::with_tcp(unix, tcp, ctx)
            }
            None => Listener::new(unix, ctx),
        };
        listener.run().await;
        let _ = std::fs::remove_file(&socket_path);
    }

    Ok(())
}

/// `FL_SLAVES` holds `id=host:port` pairs separated by commas; all start
/// as online and are re-probed per request.
fn register_slaves_from_env(orchestrator: &Orchestrator<SystemClock>) {
    let Ok(raw) = std::env::var("FL_SLAVES") else {
        return;
    };
    for entry in raw.split(',').filter(|s| !s.trim().is_empty()) {
        match entry.split_once('=') {
            Some((id, address)) => orchestrator.slaves().register(SlaveInfo {
                id: id.trim().to_string(),
                address: address.trim().to_string(),
                state: SlaveState::Online,
            }),
            None => tracing::warn!(entry, "ignoring malformed FL_SLAVES entry"),
        }
    }
}
