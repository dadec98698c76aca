// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out (bidirectional) mode scenarios.

use super::support::workflow;
use fl_core::{EventPayload, SessionId, Step, SystemClock};
use fl_daemon::{FanoutHub, MasterExecutor};
use fl_engine::{Engine, HandlerRegistry};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn debug_run_fans_out_to_every_observer() {
    let hub = Arc::new(FanoutHub::new());
    let engine = Arc::new(Engine::new(HandlerRegistry::builtin()));
    let master = MasterExecutor::new(engine, Arc::clone(&hub), SystemClock);

    let session_id = SessionId::from_string("ses-debug");
    let (tx_a, mut rx_a) = mpsc::channel(64);
    let (tx_b, mut rx_b) = mpsc::channel(64);
    hub.register(session_id, tx_a);
    hub.register(session_id, tx_b);

    let mut failing = Step::leaf("s2", "fail");
    failing.params.insert("message".into(), json!("boom"));
    failing.on_error = Some(fl_core::OnErrorPolicy::Continue);

    let results = master
        .execute(
            session_id,
            workflow(vec![Step::leaf("s1", "noop"), failing, Step::leaf("s3", "noop")]),
            CancellationToken::new(),
        )
        .await;
    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].success);

    for rx in [&mut rx_a, &mut rx_b] {
        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.type_name().to_string());
        }
        assert_eq!(
            types,
            vec![
                "step_started",
                "step_completed",
                "progress",
                "step_started",
                "step_failed",
                "progress",
                "step_started",
                "step_completed",
                "progress",
                "debug_completed",
            ]
        );
    }
}

#[tokio::test]
async fn debug_terminal_carries_full_result_list() {
    let hub = Arc::new(FanoutHub::new());
    let engine = Arc::new(Engine::new(HandlerRegistry::builtin()));
    let master = MasterExecutor::new(engine, Arc::clone(&hub), SystemClock);

    let session_id = SessionId::from_string("ses-debug-2");
    let (tx, mut rx) = mpsc::channel(64);
    hub.register(session_id, tx);

    master
        .execute(
            session_id,
            workflow(vec![Step::leaf("s1", "noop"), Step::leaf("s2", "noop")]),
            CancellationToken::new(),
        )
        .await;

    let mut terminal = None;
    while let Ok(event) = rx.try_recv() {
        if let EventPayload::DebugCompleted { status, step_results } = event.payload {
            terminal = Some((status, step_results));
        }
    }
    let (status, step_results) = terminal.expect("debug_completed seen");
    assert_eq!(status, "success");
    assert_eq!(step_results.len(), 2);
    assert_eq!(step_results[0].step_id, "s1");
    assert_eq!(step_results[1].step_id, "s2");
}
