// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-callback adapter for one session.
//!
//! Bridges the engine's callback surface onto the session's event stream
//! and bookkeeping. Holds only the session id and resolves the session
//! lazily through the registry — the workflow must never own the session
//! that owns the writer it writes to.
//!
//! The terminal `workflow_completed` is emitted from exactly one place:
//! [`SessionCallback::emit_terminal`], guarded by the session's once-flag.
//! The engine's `on_execution_complete` only snapshots variables.

use crate::sessions::{Session, SessionRegistry};
use async_trait::async_trait;
use fl_core::{Clock, Event, EventPayload, SessionId, SessionStatus, StepExecutionResult};
use fl_engine::{
    ExecutionCallback, InteractionReply, InteractionRequest, StepInfo, StepOutcome, StepStatus,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Implements the engine callback contract for one session.
pub struct SessionCallback<C: Clock> {
    registry: Arc<SessionRegistry<C>>,
    session_id: SessionId,
}

impl<C: Clock> SessionCallback<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>, session_id: SessionId) -> Self {
        Self { registry, session_id }
    }

    fn session(&self) -> Option<Arc<Session<C>>> {
        self.registry.get(&self.session_id)
    }

    async fn emit(&self, payload: EventPayload) {
        let Some(session) = self.session() else {
            return;
        };
        if let Err(e) = session.writer().write(Event::new(payload)).await {
            tracing::debug!(session_id = %self.session_id, error = %e, "event write dropped");
        }
    }

    /// Emit the one terminal `workflow_completed` for this session. The
    /// first caller wins; every later call is a no-op.
    pub async fn emit_terminal(&self, status: SessionStatus) {
        let Some(session) = self.session() else {
            return;
        };
        if !session.take_terminal() {
            return;
        }
        let counters = session.counters();
        self.emit(EventPayload::WorkflowCompleted {
            status: status.wire_status().to_string(),
            total_steps: counters.total_steps,
            success_steps: counters.success_steps,
            failed_steps: counters.failed_steps,
            duration_ms: session.elapsed_ms(),
            variables: session.variables(),
            environment: session.environment(),
        })
        .await;
    }
}

#[async_trait]
impl<C: Clock> ExecutionCallback for SessionCallback<C> {
    async fn on_step_started(&self, info: &StepInfo) {
        self.emit(EventPayload::StepStarted {
            step_id: info.step_id.clone(),
            step_name: info.step_name.clone(),
            step_type: info.step_type.clone(),
            parent_id: info.parent_id.clone(),
            iteration: info.iteration,
        })
        .await;
    }

    async fn on_step_completed(&self, outcome: &StepOutcome) {
        if let Some(session) = self.session() {
            session.record_step(StepExecutionResult {
                step_id: outcome.step_id.clone(),
                step_name: outcome.step_name.clone(),
                step_type: outcome.step_type.clone(),
                success: outcome.success(),
                duration_ms: outcome.duration_ms,
                output: outcome.output.clone(),
                error: outcome.error.clone(),
            });
        }
        match outcome.status {
            StepStatus::Success => {
                self.emit(EventPayload::StepCompleted {
                    step_id: outcome.step_id.clone(),
                    step_name: outcome.step_name.clone(),
                    success: true,
                    duration_ms: outcome.duration_ms,
                    output: outcome.output.clone(),
                })
                .await;
            }
            StepStatus::Failed => {
                self.emit(EventPayload::StepFailed {
                    step_id: outcome.step_id.clone(),
                    step_name: outcome.step_name.clone(),
                    error: outcome.error.clone(),
                    duration_ms: outcome.duration_ms,
                })
                .await;
            }
        }
    }

    // Notification only; `on_step_completed` carries the counted failure.
    async fn on_step_failed(&self, step_id: &str, error: &str) {
        tracing::debug!(session_id = %self.session_id, step_id, error, "step failed");
    }

    async fn on_step_skipped(&self, step_id: &str, step_name: &str, reason: &str) {
        self.emit(EventPayload::StepSkipped {
            step_id: step_id.to_string(),
            step_name: step_name.to_string(),
            reason: reason.to_string(),
        })
        .await;
    }

    async fn on_progress(&self, current: u64, total: u64) {
        let percentage = if total > 0 { current * 100 / total } else { 0 };
        self.emit(EventPayload::Progress { current, total, percentage }).await;
    }

    async fn on_execution_complete(&self, variables: &IndexMap<String, Value>) {
        if let Some(session) = self.session() {
            session.set_variables(variables.clone());
        }
    }

    async fn on_ai_chunk(&self, step_id: &str, content: &str) {
        self.emit(EventPayload::AiChunk {
            step_id: step_id.to_string(),
            content: content.to_string(),
        })
        .await;
    }

    async fn on_ai_complete(&self, step_id: &str, content: &str) {
        self.emit(EventPayload::AiComplete {
            step_id: step_id.to_string(),
            content: content.to_string(),
        })
        .await;
    }

    async fn on_ai_error(&self, step_id: &str, error: &str) {
        self.emit(EventPayload::AiError {
            step_id: step_id.to_string(),
            error: error.to_string(),
        })
        .await;
    }

    async fn on_ai_thinking(&self, step_id: &str, round: u32, content: &str) {
        self.emit(EventPayload::AiThinking {
            step_id: step_id.to_string(),
            round,
            content: content.to_string(),
        })
        .await;
    }

    async fn on_ai_tool_call_start(&self, step_id: &str, tool: &str, arguments: &Value) {
        self.emit(EventPayload::AiToolCallStart {
            step_id: step_id.to_string(),
            tool: tool.to_string(),
            arguments: arguments.clone(),
        })
        .await;
    }

    async fn on_ai_tool_call_complete(&self, step_id: &str, tool: &str, result: Option<&Value>) {
        self.emit(EventPayload::AiToolCallComplete {
            step_id: step_id.to_string(),
            tool: tool.to_string(),
            result: result.cloned(),
        })
        .await;
    }

    /// Announce the pause on the stream, then park on the rendezvous until
    /// the client answers, the wait times out, or the session is cancelled.
    /// The status flips before the event is visible, so a client reacting
    /// to the event always finds the session accepting replies.
    async fn on_interaction(&self, request: &InteractionRequest) -> InteractionReply {
        if let Some(session) = self.session() {
            session.set_status(SessionStatus::WaitingInteraction);
        }
        self.emit(EventPayload::AiInteractionRequired {
            step_id: request.step_id.clone(),
            prompt: request.prompt.clone(),
            timeout_secs: request.timeout_secs,
        })
        .await;
        self.registry
            .wait_for_interaction(&self.session_id, Duration::from_secs(request.timeout_secs))
            .await
            .into_reply()
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
