// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn wire_shape_has_type_and_data() {
    let mut event = Event::new(EventPayload::StepStarted {
        step_id: "s1".into(),
        step_name: "ping".into(),
        step_type: "noop".into(),
        parent_id: None,
        iteration: None,
    });
    event.session_id = SessionId::from_string("ses-1");
    event.timestamp = 1234;

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "step_started");
    assert_eq!(json["session_id"], "ses-1");
    assert_eq!(json["timestamp"], 1234);
    assert_eq!(json["data"]["step_id"], "s1");
    assert!(json["data"].get("parent_id").is_none());
}

#[test]
fn envelope_round_trips() {
    let mut event = Event::new(EventPayload::WorkflowCompleted {
        status: "success".into(),
        total_steps: 3,
        success_steps: 3,
        failed_steps: 0,
        duration_ms: 99,
        variables: IndexMap::new(),
        environment: IndexMap::new(),
    });
    event.session_id = SessionId::from_string("ses-2");
    event.timestamp = 5;

    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn interaction_timeout_field_is_named_timeout() {
    let event = Event::new(EventPayload::AiInteractionRequired {
        step_id: "s1".into(),
        prompt: "continue?".into(),
        timeout_secs: 60,
    });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["data"]["timeout"], 60);
}

#[test]
fn error_helper_fills_recoverable_flag() {
    let event = Event::error(ErrorCode::SlaveUnavailable, "slave offline", None);
    match event.payload {
        EventPayload::Error { code, recoverable, .. } => {
            assert_eq!(code, ErrorCode::SlaveUnavailable);
            assert!(recoverable);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn missing_session_and_timestamp_default() {
    let json = r#"{"type":"heartbeat","data":{"unix_secs":7}}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    assert!(event.session_id.is_empty());
    assert_eq!(event.timestamp, 0);
    assert!(event.payload.is_heartbeat());
}

#[test]
fn terminal_classification() {
    assert!(EventPayload::DebugCompleted { status: "failed".into(), step_results: vec![] }
        .is_terminal());
    assert!(!EventPayload::Heartbeat { unix_secs: 1 }.is_terminal());
}

#[test]
fn type_names_cover_wire_tags() {
    let event = Event::heartbeat(9);
    assert_eq!(event.type_name(), "heartbeat");

    // type_name must agree with the serde tag
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], event.type_name());
}
