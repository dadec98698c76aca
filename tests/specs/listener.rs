// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon socket surface: the NDJSON protocol over a Unix socket.

use super::support::*;
use fl_core::{Event, Step, SystemClock};
use fl_daemon::listener::{ListenCtx, Listener};
use fl_daemon::protocol::Request;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;

async fn spawn_daemon(socket: &Path) -> Arc<Notify> {
    let shutdown = Arc::new(Notify::new());
    let ctx = Arc::new(ListenCtx {
        orchestrator: orchestrator(),
        shutdown: Arc::clone(&shutdown),
    });
    let unix = UnixListener::bind(socket).expect("bind unix socket");
    tokio::spawn(Listener::<SystemClock>::new(unix, ctx).run());
    shutdown
}

async fn send_request(socket: &Path, request: &Request) -> Vec<String> {
    let mut stream = UnixStream::connect(socket).await.expect("connect");
    let line = serde_json::to_string(request).expect("encode");
    stream.write_all(line.as_bytes()).await.expect("send");
    stream.write_all(b"\n").await.expect("send newline");
    stream.flush().await.expect("flush");

    let (read_half, _write_half) = stream.into_split();
    let mut lines = Vec::new();
    let mut reader = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        lines.push(line);
    }
    lines
}

#[tokio::test]
async fn ping_pong_over_the_socket() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("fld.sock");
    let _shutdown = spawn_daemon(&socket).await;

    let lines = send_request(&socket, &Request::Ping).await;
    assert_eq!(lines, vec![r#"{"type":"pong"}"#]);
}

#[tokio::test]
async fn execute_streams_events_and_closes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("fld.sock");
    let _shutdown = spawn_daemon(&socket).await;

    let request = Request::Execute {
        request: local_request(),
        workflow: workflow(vec![Step::leaf("s1", "noop")]),
    };
    let lines = send_request(&socket, &request).await;
    let events: Vec<Event> = lines
        .iter()
        .map(|l| serde_json::from_str(l).expect("event line"))
        .collect();

    assert_eq!(
        event_types(&events),
        vec!["step_started", "step_completed", "progress", "workflow_completed"]
    );
    assert_single_terminal(&events);
}

#[tokio::test]
async fn stop_for_unknown_session_reports_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("fld.sock");
    let _shutdown = spawn_daemon(&socket).await;

    let lines = send_request(
        &socket,
        &Request::Stop { session_id: "ses-missing".into() },
    )
    .await;
    let value: Value = serde_json::from_str(&lines[0]).expect("response");
    assert_eq!(value["type"], "error");
    assert_eq!(value["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("fld.sock");
    let shutdown = spawn_daemon(&socket).await;

    // A request before shutdown works
    let lines = send_request(&socket, &Request::Ping).await;
    assert_eq!(lines.len(), 1);

    shutdown.notify_waiters();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // After shutdown the socket refuses new connections
    let connect = tokio::time::timeout(
        std::time::Duration::from_millis(200),
        UnixStream::connect(&socket),
    )
    .await;
    match connect {
        Ok(Ok(_)) => panic!("listener still accepting after shutdown"),
        Ok(Err(_)) | Err(_) => {}
    }
}
