// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote executor: runs one session on a slave host.
//!
//! Forwards the slave's event stream verbatim to the session's writer,
//! mediates interaction pauses through the session rendezvous, and keeps a
//! keepalive heartbeat only while the stream is quiet. A slave-reported
//! `error` event is recorded and the stream drained to the end so late
//! completions are not lost.

use super::client::SlaveClient;
use super::registry::{SlaveDirectory, SlaveState};
use super::{InteractionPost, SlaveExecuteRequest};
use crate::env::OrchestratorConfig;
use crate::sessions::{Session, SessionRegistry};
use fl_core::{Clock, Event, EventPayload, FlowError, SessionStatus, StepCounters, Workflow};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Run `workflow` on the slave named by `slave_id` and return the
/// session's terminal status.
#[allow(clippy::too_many_arguments)]
pub async fn execute_remote<C: Clock>(
    registry: &Arc<SessionRegistry<C>>,
    session: &Arc<Session<C>>,
    slaves: &SlaveDirectory,
    slave_id: &str,
    workflow: Workflow,
    timeout_secs: Option<u64>,
    config: &OrchestratorConfig,
    cancel: CancellationToken,
) -> Result<SessionStatus, FlowError> {
    let info = slaves
        .get(slave_id)
        .ok_or_else(|| FlowError::SlaveUnavailable(slave_id.to_string()))?;
    if info.state != SlaveState::Online {
        return Err(FlowError::SlaveUnavailable(slave_id.to_string()));
    }

    // Liveness probe before committing the stream.
    let probed = SlaveClient::ping(&info.address).await?;
    if probed != SlaveState::Online {
        slaves.set_state(slave_id, probed);
        return Err(FlowError::SlaveUnavailable(slave_id.to_string()));
    }

    let session_id = session.id();
    let request = SlaveExecuteRequest {
        session_id: session_id.to_string(),
        workflow,
        variables: indexmap::IndexMap::new(),
        timeout_secs,
        interaction_url: config
            .callback_base_url
            .as_ref()
            .map(|base| format!("{base}/sessions/{session_id}/interaction")),
    };
    let mut stream = SlaveClient::open_stream(&info.address, &request).await?;
    tracing::info!(session_id = %session_id, slave_id, address = %info.address, "remote stream opened");

    let keepalive = config.heartbeat_interval_remote;
    let mut last_event = Instant::now();
    let mut terminal_adopted = false;

    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    last_event = Instant::now();
                    handle_event(registry, session, &info.address, text.as_str(), &mut terminal_adopted)
                        .await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong/binary
                Some(Err(e)) => {
                    // An abrupt close after the terminal frame is just the
                    // end of the stream.
                    if terminal_adopted {
                        break;
                    }
                    tracing::warn!(session_id = %session_id, error = %e, "slave stream error");
                    session.record_error(e.to_string());
                    return Err(FlowError::SlaveConnection(e.to_string()));
                }
            },
            // Keepalive only while no real events are flowing, and never
            // after the terminal frame went through
            _ = tokio::time::sleep_until(last_event + keepalive) => {
                if !terminal_adopted {
                    let _ = session.writer().write_heartbeat().await;
                }
                last_event = Instant::now();
            }
            _ = cancel.cancelled() => {
                // Tell the slave to stop its side; best-effort.
                if let Err(e) = SlaveClient::post_stop(&info.address, &session_id.to_string()).await {
                    tracing::debug!(session_id = %session_id, error = %e, "remote stop post failed");
                }
                return Err(FlowError::Cancelled);
            }
        }
    }

    if terminal_adopted {
        Ok(session.status())
    } else {
        Err(FlowError::SlaveConnection(
            "stream ended before terminal event".into(),
        ))
    }
}

async fn handle_event<C: Clock>(
    registry: &Arc<SessionRegistry<C>>,
    session: &Arc<Session<C>>,
    address: &str,
    text: &str,
    terminal_adopted: &mut bool,
) {
    let event: Event = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(session_id = %session.id(), error = %e, "unparseable slave event");
            return;
        }
    };

    // Suspend before the pause event is visible so a reacting client
    // always finds the session accepting replies.
    if matches!(event.payload, EventPayload::AiInteractionRequired { .. }) {
        session.set_status(SessionStatus::WaitingInteraction);
    }

    // Pass-through: the client sees exactly what the slave emitted, in the
    // slave's order.
    if let Err(e) = session.writer().write(event.clone()).await {
        tracing::debug!(session_id = %session.id(), error = %e, "forward dropped");
    }

    match &event.payload {
        EventPayload::WorkflowCompleted {
            status,
            total_steps,
            success_steps,
            failed_steps,
            ..
        } => {
            let terminal = match status.as_str() {
                "success" => SessionStatus::Completed,
                "stopped" => SessionStatus::Stopped,
                _ => SessionStatus::Failed,
            };
            session.adopt_summary(
                StepCounters {
                    total_steps: *total_steps,
                    success_steps: *success_steps,
                    failed_steps: *failed_steps,
                },
                terminal,
            );
            // The forwarded frame is the session's one terminal event.
            session.take_terminal();
            *terminal_adopted = true;
        }
        EventPayload::AiInteractionRequired { step_id, timeout_secs, .. } => {
            let reply = registry
                .wait_for_interaction(&session.id(), Duration::from_secs(*timeout_secs))
                .await
                .into_reply();
            let post = InteractionPost {
                session_id: session.id().to_string(),
                step_id: step_id.clone(),
                value: reply.value,
                skipped: reply.skipped,
            };
            if let Err(e) = SlaveClient::post_interaction(address, &post).await {
                tracing::warn!(session_id = %session.id(), error = %e, "interaction post failed");
                session.record_error(e.to_string());
            }
        }
        EventPayload::Error { message, .. } => {
            // Record and keep draining; late completions must not be lost.
            session.record_error(message.clone());
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
