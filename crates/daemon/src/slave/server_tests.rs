// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::slave::client::SlaveClient;
use crate::test_helpers::fast_config;
use fl_core::{Event, Step, SystemClock, Workflow};
use fl_engine::{Engine, HandlerRegistry};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_slave() -> (String, Arc<Notify>) {
    let engine = Arc::new(Engine::new(HandlerRegistry::builtin()));
    let orchestrator = Arc::new(Orchestrator::new(Some(engine), fast_config(), SystemClock));
    let shutdown = Arc::new(Notify::new());
    let server = Arc::new(SlaveServer::new(
        orchestrator,
        Arc::clone(&shutdown),
        SystemClock,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    tokio::spawn(server.run(listener));
    (addr, shutdown)
}

fn request(session_id: &str, steps: Vec<Step>) -> SlaveExecuteRequest {
    SlaveExecuteRequest {
        session_id: session_id.into(),
        workflow: Workflow {
            id: "wf-slave".into(),
            name: "slave test".into(),
            steps,
            ..Workflow::default()
        },
        variables: indexmap::IndexMap::new(),
        timeout_secs: None,
        interaction_url: None,
    }
}

#[tokio::test]
async fn ping_reports_online() {
    let (addr, _shutdown) = spawn_slave().await;
    let state = SlaveClient::ping(&addr).await.unwrap();
    assert_eq!(state, SlaveState::Online);
}

#[tokio::test]
async fn unknown_path_is_rejected() {
    let (addr, _shutdown) = spawn_slave().await;
    let err = http::get(&addr, "/api/v1/nope").await.unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn blocking_execute_returns_summary() {
    let (addr, _shutdown) = spawn_slave().await;
    let summary = SlaveClient::execute_blocking(
        &addr,
        &request("ses-blk", vec![Step::leaf("s1", "noop")]),
    )
    .await
    .unwrap();
    assert_eq!(summary.status, "success");
    assert_eq!(summary.total_steps, 1);
    assert_eq!(summary.session_id, "ses-blk");
}

#[tokio::test]
async fn stream_execute_emits_ordered_events() {
    let (addr, _shutdown) = spawn_slave().await;
    let mut stream = SlaveClient::open_stream(
        &addr,
        &request("ses-stream", vec![Step::leaf("s1", "noop")]),
    )
    .await
    .unwrap();

    let mut types = Vec::new();
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message;
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                let event: Event = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(event.session_id, "ses-stream");
                if !event.payload.is_heartbeat() {
                    types.push(event.type_name());
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    assert_eq!(
        types,
        vec!["step_started", "step_completed", "progress", "workflow_completed"]
    );
}

#[tokio::test]
async fn interaction_post_without_waiting_session_conflicts() {
    let (addr, _shutdown) = spawn_slave().await;
    let err = SlaveClient::post_interaction(
        &addr,
        &InteractionPost {
            session_id: "ses-none".into(),
            step_id: "s1".into(),
            value: Some(json!("yes")),
            skipped: false,
        },
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("409"));
}

#[tokio::test]
async fn stop_post_for_unknown_session_conflicts() {
    let (addr, _shutdown) = spawn_slave().await;
    let err = SlaveClient::post_stop(&addr, "ses-none").await.unwrap_err();
    assert!(err.to_string().contains("409"));
}

#[tokio::test]
async fn malformed_execute_body_is_bad_request() {
    let (addr, _shutdown) = spawn_slave().await;
    let err = http::post(&addr, "/api/v1/execute", "{not json").await.unwrap_err();
    assert!(err.to_string().contains("400"));
}
