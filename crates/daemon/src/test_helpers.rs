// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests.

use crate::env::OrchestratorConfig;
use crate::stream::EventStreamWriter;
use fl_core::{Clock, Event, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

/// Writer over an in-memory pipe; read the far end to observe the stream.
pub fn capture_writer<C: Clock>(
    session_id: SessionId,
    clock: C,
) -> (Arc<EventStreamWriter<C>>, DuplexStream) {
    let (near, far) = tokio::io::duplex(64 * 1024);
    let writer = Arc::new(EventStreamWriter::new(session_id, Box::new(near), clock));
    (writer, far)
}

/// Drain the captured stream to EOF and parse every line as an event.
/// Call after the writer is closed.
pub async fn collect_events(far: DuplexStream) -> Vec<Event> {
    let mut events = Vec::new();
    let mut lines = BufReader::new(far).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match serde_json::from_str(&line) {
            Ok(event) => events.push(event),
            Err(e) => panic!("unparseable event line {line:?}: {e}"),
        }
    }
    events
}

/// Wire type tags, in stream order, heartbeats filtered out.
pub fn event_types(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .filter(|e| !e.payload.is_heartbeat())
        .map(|e| e.type_name())
        .collect()
}

/// Config with sub-second cadence so tests finish quickly.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        default_timeout: Duration::from_secs(10),
        heartbeat_interval_local: Duration::from_millis(50),
        heartbeat_interval_remote: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        interaction_default_timeout: Duration::from_millis(200),
        callback_base_url: None,
    }
}
