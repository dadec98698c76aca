// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote (slave) execution scenarios against a real in-process slave host.

use super::support::*;
use fl_core::{ErrorCode, EventPayload, SessionId, Step};
use fl_daemon::orchestrator::{ExecuteRequest, ExecutorType};
use fl_daemon::slave::{SlaveInfo, SlaveState};
use fl_engine::InteractionReply;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn remote_request(slave_id: &str) -> ExecuteRequest {
    ExecuteRequest {
        workflow_id: "wf-spec".into(),
        executor_type: ExecutorType::Remote,
        slave_id: Some(slave_id.into()),
        ..ExecuteRequest::default()
    }
}

async fn master_with_slave() -> (Arc<fl_daemon::Orchestrator<fl_core::SystemClock>>, String) {
    let (addr, _shutdown) = spawn_slave().await;
    let orch = orchestrator();
    orch.slaves().register(SlaveInfo {
        id: "slave-1".into(),
        address: addr.clone(),
        state: SlaveState::Online,
    });
    (orch, addr)
}

#[tokio::test]
async fn remote_run_passes_events_through() {
    let (orch, _addr) = master_with_slave().await;
    let (writer, far) = capture_writer("ses-remote-1");

    let summary = orch
        .execute_with_writer(
            remote_request("slave-1"),
            workflow(vec![Step::leaf("s1", "noop"), Step::leaf("s2", "noop")]),
            writer,
        )
        .await
        .expect("accepted");

    assert_eq!(summary.status, "success");
    assert_eq!(summary.total_steps, 2);

    let events = collect_events(far).await;
    assert_eq!(
        event_types(&events),
        vec![
            "step_started",
            "step_completed",
            "progress",
            "step_started",
            "step_completed",
            "progress",
            "workflow_completed",
        ]
    );
    assert_single_terminal(&events);
    assert_step_pairing(&events);
    // Slave ordering is preserved verbatim on the master stream
    for event in &events {
        assert_eq!(event.session_id, "ses-remote-1");
    }
}

#[tokio::test]
async fn remote_hitl_round_trip() {
    let (orch, _addr) = master_with_slave().await;
    let session_id = SessionId::from_string("ses-remote-hitl");
    let (writer, far) = capture_writer("ses-remote-hitl");

    let mut confirm = Step::leaf("s1", "confirm");
    confirm.params.insert("prompt".into(), json!("deploy?"));
    confirm.params.insert("timeout".into(), json!(10));
    confirm.params.insert("store_as".into(), json!("answer"));

    // The client answers through the master's unary surface once the
    // master session shows waiting.
    let submitter = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move {
            for _ in 0..1000 {
                let submitted = orch.submit_interaction(
                    &session_id,
                    "s1",
                    InteractionReply::answered(json!("yes")),
                );
                if submitted.is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("interaction never accepted");
        })
    };

    let summary = orch
        .execute_with_writer(remote_request("slave-1"), workflow(vec![confirm]), writer)
        .await
        .expect("accepted");
    submitter.await.expect("submitter");

    assert_eq!(summary.status, "success");
    let events = collect_events(far).await;
    let types = event_types(&events);
    assert_eq!(
        types,
        vec![
            "step_started",
            "ai_interaction_required",
            "step_completed",
            "progress",
            "workflow_completed",
        ]
    );
    assert_single_terminal(&events);

    // The slave saw the client's value: it landed in the final variables
    match &events.last().expect("terminal").payload {
        EventPayload::WorkflowCompleted { variables, status, .. } => {
            assert_eq!(status, "success");
            assert_eq!(variables["answer"], json!("yes"));
        }
        other => panic!("unexpected terminal: {other:?}"),
    }
}

#[tokio::test]
async fn remote_hitl_timeout_skips_and_run_continues() {
    let (orch, _addr) = master_with_slave().await;
    let (writer, far) = capture_writer("ses-remote-skip");

    let mut confirm = Step::leaf("s1", "confirm");
    confirm.params.insert("timeout".into(), json!(1));
    confirm.params.insert("store_as".into(), json!("answer"));

    // No client reply: both sides time out into a skip and the run
    // finishes with the engine's decision.
    let summary = orch
        .execute_with_writer(
            remote_request("slave-1"),
            workflow(vec![confirm, Step::leaf("s2", "noop")]),
            writer,
        )
        .await
        .expect("accepted");

    assert_eq!(summary.status, "success");
    assert_eq!(summary.total_steps, 2);

    let events = collect_events(far).await;
    let types = event_types(&events);
    assert!(types.contains(&"ai_interaction_required"));
    assert_single_terminal(&events);
    match &events.last().expect("terminal").payload {
        EventPayload::WorkflowCompleted { variables, .. } => {
            assert_eq!(variables["answer"], serde_json::Value::Null);
        }
        other => panic!("unexpected terminal: {other:?}"),
    }
}

#[tokio::test]
async fn offline_slave_rejected_without_session() {
    let orch = orchestrator();
    orch.slaves().register(SlaveInfo {
        id: "slave-off".into(),
        address: "127.0.0.1:1".into(),
        state: SlaveState::Offline,
    });
    let (writer, far) = capture_writer("ses-remote-off");

    let err = orch
        .execute_with_writer(remote_request("slave-off"), workflow(vec![]), writer)
        .await
        .expect_err("rejected");
    assert_eq!(err.code(), ErrorCode::SlaveUnavailable);
    assert!(orch.sessions().is_empty());

    let events = collect_events(far).await;
    assert_eq!(event_types(&events), vec!["error"]);
}

#[tokio::test]
async fn unreachable_slave_fails_session_with_connection_error() {
    let orch = orchestrator();
    orch.slaves().register(SlaveInfo {
        id: "slave-dead".into(),
        address: "127.0.0.1:1".into(),
        state: SlaveState::Online,
    });
    let (writer, far) = capture_writer("ses-remote-dead");

    let summary = orch
        .execute_with_writer(
            remote_request("slave-dead"),
            workflow(vec![Step::leaf("s1", "noop")]),
            writer,
        )
        .await
        .expect("session ran");
    assert_eq!(summary.status, "failed");

    let events = collect_events(far).await;
    let types = event_types(&events);
    assert!(types.contains(&"error"));
    assert_single_terminal(&events);
    let code = events
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::Error { code, .. } => Some(*code),
            _ => None,
        })
        .expect("error event");
    assert_eq!(code, ErrorCode::SlaveConnectionError);
}

#[tokio::test]
async fn remote_blocking_returns_the_slave_summary() {
    let (orch, _addr) = master_with_slave().await;
    let summary = orch
        .execute_blocking(
            remote_request("slave-1"),
            workflow(vec![Step::leaf("s1", "noop")]),
        )
        .await
        .expect("summary");
    assert_eq!(summary.status, "success");
    assert_eq!(summary.total_steps, 1);
    // The blocking remote path never creates a master-side session
    assert!(orch.sessions().is_empty());
}
