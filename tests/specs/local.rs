// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local execution scenarios.

use super::support::*;
use fl_core::{EventPayload, OnErrorPolicy, SessionId, Step};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn single_step_local_success() {
    let orch = orchestrator();
    let (writer, far) = capture_writer("ses-spec-1");

    let summary = orch
        .execute_with_writer(
            local_request(),
            workflow(vec![Step::leaf("s1", "noop")]),
            writer,
        )
        .await
        .expect("accepted");

    assert_eq!(summary.status, "success");
    assert_eq!(
        (summary.total_steps, summary.success_steps, summary.failed_steps),
        (1, 1, 0)
    );

    let events = collect_events(far).await;
    assert_eq!(
        event_types(&events),
        vec!["step_started", "step_completed", "progress", "workflow_completed"]
    );
    assert_single_terminal(&events);
    assert_step_pairing(&events);
}

#[tokio::test]
async fn two_step_failure_with_abort_policy() {
    let orch = orchestrator();
    let (writer, far) = capture_writer("ses-spec-2");

    let mut s1 = Step::leaf("s1", "fail");
    s1.params.insert("message".into(), json!("first failure"));
    s1.on_error = Some(OnErrorPolicy::Continue);
    let mut s2 = Step::leaf("s2", "fail");
    s2.params.insert("message".into(), json!("second failure"));
    s2.on_error = Some(OnErrorPolicy::Abort);

    let summary = orch
        .execute_with_writer(local_request(), workflow(vec![s1, s2]), writer)
        .await
        .expect("accepted");

    assert_eq!(summary.status, "failed");
    assert_eq!(
        (summary.total_steps, summary.success_steps, summary.failed_steps),
        (2, 0, 2)
    );

    let events = collect_events(far).await;
    assert_eq!(
        event_types(&events),
        vec![
            "step_started",
            "step_failed",
            "progress",
            "step_started",
            "step_failed",
            "progress",
            "workflow_completed",
        ]
    );
    assert_single_terminal(&events);
    assert_step_pairing(&events);
}

#[tokio::test]
async fn stop_mid_run_produces_no_further_starts() {
    let orch = orchestrator();
    let session_id = SessionId::from_string("ses-spec-3");
    let (writer, far) = capture_writer("ses-spec-3");

    let mut s2 = Step::leaf("s2", "wait");
    s2.params.insert("duration_ms".into(), json!(60_000));
    let steps = vec![
        Step::leaf("s1", "noop"),
        s2,
        Step::leaf("s3", "noop"),
        Step::leaf("s4", "noop"),
        Step::leaf("s5", "noop"),
    ];

    let stopper = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move {
            loop {
                if orch.stop(&session_id).is_ok() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let summary = orch
        .execute_with_writer(local_request(), workflow(steps), writer)
        .await
        .expect("accepted");
    stopper.await.expect("stopper");

    assert_eq!(summary.status, "stopped");
    let events = collect_events(far).await;
    assert_single_terminal(&events);

    match &events.last().expect("terminal").payload {
        EventPayload::WorkflowCompleted { status, .. } => assert_eq!(status, "stopped"),
        other => panic!("unexpected terminal: {other:?}"),
    }
    // Nothing after the stopped step ever started
    for event in &events {
        if let EventPayload::StepStarted { step_id, .. } = &event.payload {
            assert!(step_id == "s1" || step_id == "s2", "unexpected start: {step_id}");
        }
    }
}

#[tokio::test]
async fn zero_step_workflow_completes_with_zero_counters() {
    let orch = orchestrator();
    let (writer, far) = capture_writer("ses-spec-4");

    let summary = orch
        .execute_with_writer(local_request(), workflow(vec![]), writer)
        .await
        .expect("accepted");
    assert_eq!(summary.status, "success");
    assert_eq!(summary.total_steps, 0);

    let events = collect_events(far).await;
    assert_eq!(event_types(&events), vec!["workflow_completed"]);
    assert_single_terminal(&events);
}

#[tokio::test]
async fn counters_add_up_at_terminal() {
    let orch = orchestrator();
    let (writer, far) = capture_writer("ses-spec-5");

    let mut failing = Step::leaf("s2", "fail");
    failing.on_error = Some(OnErrorPolicy::Continue);
    let steps = vec![
        Step::leaf("s1", "noop"),
        failing,
        Step::leaf("s3", "noop"),
    ];

    orch.execute_with_writer(local_request(), workflow(steps), writer)
        .await
        .expect("accepted");

    let events = collect_events(far).await;
    match &events.last().expect("terminal").payload {
        EventPayload::WorkflowCompleted {
            total_steps,
            success_steps,
            failed_steps,
            status,
            ..
        } => {
            assert_eq!(*total_steps, success_steps + failed_steps);
            assert_eq!((*total_steps, *success_steps, *failed_steps), (3, 2, 1));
            assert_eq!(status, "failed");
        }
        other => panic!("unexpected terminal: {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_sessions_never_share_a_stream() {
    let orch = orchestrator();
    let (writer_a, far_a) = capture_writer("ses-spec-iso-a");
    let (writer_b, far_b) = capture_writer("ses-spec-iso-b");

    let run_a = orch.execute_with_writer(
        local_request(),
        workflow(vec![Step::leaf("a1", "noop"), Step::leaf("a2", "noop")]),
        writer_a,
    );
    let run_b = orch.execute_with_writer(
        local_request(),
        workflow(vec![Step::leaf("b1", "noop"), Step::leaf("b2", "noop")]),
        writer_b,
    );
    let (summary_a, summary_b) = tokio::join!(run_a, run_b);
    assert_eq!(summary_a.expect("a").status, "success");
    assert_eq!(summary_b.expect("b").status, "success");

    let events_a = collect_events(far_a).await;
    let events_b = collect_events(far_b).await;
    for event in &events_a {
        assert_eq!(event.session_id, "ses-spec-iso-a");
    }
    for event in &events_b {
        assert_eq!(event.session_id, "ses-spec-iso-b");
    }
    assert_single_terminal(&events_a);
    assert_single_terminal(&events_b);
}

#[tokio::test]
async fn skipped_steps_still_reach_full_progress() {
    let orch = orchestrator();
    let (writer, far) = capture_writer("ses-spec-6");

    // A disabled step next to a real one: the skip leaves the counters
    // alone but the progress bar still ends at 100%.
    let mut disabled = Step::leaf("s1", "noop");
    disabled.params.insert("disabled".into(), json!(true));

    let summary = orch
        .execute_with_writer(
            local_request(),
            workflow(vec![disabled, Step::leaf("s2", "noop")]),
            writer,
        )
        .await
        .expect("accepted");
    assert_eq!(summary.total_steps, 1);
    assert_eq!(summary.success_steps, 1);

    let events = collect_events(far).await;
    assert_eq!(
        event_types(&events),
        vec![
            "step_skipped",
            "progress",
            "step_started",
            "step_completed",
            "progress",
            "workflow_completed",
        ]
    );
    let last_progress = events
        .iter()
        .rev()
        .find_map(|e| match e.payload {
            EventPayload::Progress { percentage, .. } => Some(percentage),
            _ => None,
        })
        .expect("progress emitted");
    assert_eq!(last_progress, 100);
}
