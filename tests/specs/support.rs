// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end scenarios.

use fl_core::{Event, SessionId, Step, SystemClock, Workflow};
use fl_daemon::orchestrator::{ExecuteRequest, Orchestrator};
use fl_daemon::slave::SlaveServer;
use fl_daemon::{EventStreamWriter, OrchestratorConfig};
use fl_engine::{Engine, HandlerRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Orchestrator with the built-in engine and sub-second cadence.
pub fn orchestrator() -> Arc<Orchestrator<SystemClock>> {
    Arc::new(Orchestrator::new(
        Some(Arc::new(Engine::new(HandlerRegistry::builtin()))),
        fast_config(),
        SystemClock,
    ))
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        default_timeout: Duration::from_secs(20),
        heartbeat_interval_local: Duration::from_millis(100),
        heartbeat_interval_remote: Duration::from_millis(100),
        poll_interval: Duration::from_millis(5),
        interaction_default_timeout: Duration::from_millis(300),
        callback_base_url: None,
    }
}

/// Writer over an in-memory pipe plus the observing end.
pub fn capture_writer(id: &str) -> (Arc<EventStreamWriter<SystemClock>>, DuplexStream) {
    let (near, far) = tokio::io::duplex(64 * 1024);
    (
        Arc::new(EventStreamWriter::new(
            SessionId::from_string(id),
            Box::new(near),
            SystemClock,
        )),
        far,
    )
}

/// Drain a captured stream to EOF and parse each line.
pub async fn collect_events(far: DuplexStream) -> Vec<Event> {
    let mut events = Vec::new();
    let mut lines = BufReader::new(far).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let event: Event = serde_json::from_str(&line).expect("parseable event line");
        events.push(event);
    }
    events
}

/// Wire type tags in stream order, heartbeats dropped.
pub fn event_types(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .filter(|e| !e.payload.is_heartbeat())
        .map(|e| e.type_name())
        .collect()
}

pub fn workflow(steps: Vec<Step>) -> Workflow {
    Workflow {
        id: "wf-spec".into(),
        name: "spec workflow".into(),
        steps,
        ..Workflow::default()
    }
}

pub fn local_request() -> ExecuteRequest {
    ExecuteRequest { workflow_id: "wf-spec".into(), ..ExecuteRequest::default() }
}

/// In-process slave host on an ephemeral port; returns its address.
pub async fn spawn_slave() -> (String, Arc<Notify>) {
    let server_orchestrator = orchestrator();
    let shutdown = Arc::new(Notify::new());
    let server = Arc::new(SlaveServer::new(
        server_orchestrator,
        Arc::clone(&shutdown),
        SystemClock,
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind slave");
    let addr = listener.local_addr().expect("slave addr").to_string();
    tokio::spawn(server.run(listener));
    (addr, shutdown)
}

/// Check the per-step lifecycle pairing: every `step_started(id)` is
/// followed by exactly one terminal step event for the same id.
pub fn assert_step_pairing(events: &[Event]) {
    use fl_core::EventPayload;
    let mut open: Vec<String> = Vec::new();
    for event in events {
        match &event.payload {
            EventPayload::StepStarted { step_id, .. } => {
                assert!(
                    !open.contains(step_id),
                    "step {step_id} started twice without terminal"
                );
                open.push(step_id.clone());
            }
            EventPayload::StepCompleted { step_id, .. }
            | EventPayload::StepFailed { step_id, .. } => {
                let index = open
                    .iter()
                    .position(|id| id == step_id)
                    .unwrap_or_else(|| panic!("terminal for unstarted step {step_id}"));
                open.remove(index);
            }
            // A skip may stand alone (the step never started) or close an
            // announced step, depending on the executor.
            EventPayload::StepSkipped { step_id, .. } => {
                if let Some(index) = open.iter().position(|id| id == step_id) {
                    open.remove(index);
                }
            }
            _ => {}
        }
    }
    assert!(open.is_empty(), "steps without terminal events: {open:?}");
}

/// Exactly one `workflow_completed`, and it is the final event.
pub fn assert_single_terminal(events: &[Event]) {
    let terminals = events.iter().filter(|e| e.payload.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event");
    assert!(
        events.last().map(|e| e.payload.is_terminal()).unwrap_or(false),
        "terminal event must close the stream"
    );
}
