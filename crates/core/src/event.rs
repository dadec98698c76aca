// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event envelope streamed to clients.
//!
//! Wire shape: `{"type": "...", "session_id": "...", "timestamp": ms,
//! "data": {...}}`. The payload registry is closed; slaves and clients must
//! not invent types. Within one session, events are totally ordered by the
//! session's writer; across sessions no ordering holds.

use crate::error::ErrorCode;
use crate::session::SessionId;
use crate::step::StepExecutionResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event on a session's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "SessionId::is_empty")]
    pub session_id: SessionId,
    /// Milliseconds since the Unix epoch. Filled by the writer when zero.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    /// Event with no session/timestamp yet; the writer stamps both.
    pub fn new(payload: EventPayload) -> Self {
        Self { session_id: SessionId::default(), timestamp: 0, payload }
    }

    pub fn for_session(session_id: SessionId, payload: EventPayload) -> Self {
        Self { session_id, timestamp: 0, payload }
    }

    pub fn heartbeat(unix_secs: u64) -> Self {
        Self::new(EventPayload::Heartbeat { unix_secs })
    }

    pub fn error(code: ErrorCode, message: impl Into<String>, details: Option<Value>) -> Self {
        Self::new(EventPayload::Error {
            code,
            message: message.into(),
            details,
            recoverable: code.recoverable(),
        })
    }

    /// Wire name of the payload type, for logging.
    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}

/// Typed payloads, tagged by `type` with the body under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    #[serde(rename = "step_started")]
    StepStarted {
        step_id: String,
        step_name: String,
        step_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iteration: Option<u32>,
    },

    #[serde(rename = "step_completed")]
    StepCompleted {
        step_id: String,
        step_name: String,
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },

    #[serde(rename = "step_failed")]
    StepFailed {
        step_id: String,
        step_name: String,
        error: String,
        duration_ms: u64,
    },

    #[serde(rename = "step_skipped")]
    StepSkipped {
        step_id: String,
        step_name: String,
        reason: String,
    },

    #[serde(rename = "progress")]
    Progress {
        current: u64,
        total: u64,
        /// `current * 100 / total`; 0 when total is 0.
        percentage: u64,
    },

    #[serde(rename = "workflow_completed")]
    WorkflowCompleted {
        status: String,
        total_steps: u64,
        success_steps: u64,
        failed_steps: u64,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        variables: IndexMap<String, Value>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        environment: IndexMap<String, Value>,
    },

    #[serde(rename = "ai_chunk")]
    AiChunk { step_id: String, content: String },

    #[serde(rename = "ai_complete")]
    AiComplete {
        step_id: String,
        #[serde(default)]
        content: String,
    },

    #[serde(rename = "ai_error")]
    AiError { step_id: String, error: String },

    #[serde(rename = "ai_interaction_required")]
    AiInteractionRequired {
        step_id: String,
        #[serde(default)]
        prompt: String,
        /// Seconds the executor will wait for a reply; 0 means the
        /// orchestrator's configured default.
        #[serde(rename = "timeout", default)]
        timeout_secs: u64,
    },

    #[serde(rename = "ai_tool_call_start")]
    AiToolCallStart {
        step_id: String,
        tool: String,
        #[serde(default)]
        arguments: Value,
    },

    #[serde(rename = "ai_tool_call_complete")]
    AiToolCallComplete {
        step_id: String,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    #[serde(rename = "ai_thinking")]
    AiThinking {
        step_id: String,
        round: u32,
        #[serde(default)]
        content: String,
    },

    #[serde(rename = "heartbeat")]
    Heartbeat { unix_secs: u64 },

    #[serde(rename = "error")]
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        recoverable: bool,
    },

    /// Terminal frame of the master (fan-out) executor, carrying the full
    /// ordered result list instead of a summary.
    #[serde(rename = "debug_completed")]
    DebugCompleted {
        status: String,
        step_results: Vec<StepExecutionResult>,
    },
}

impl EventPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::StepStarted { .. } => "step_started",
            EventPayload::StepCompleted { .. } => "step_completed",
            EventPayload::StepFailed { .. } => "step_failed",
            EventPayload::StepSkipped { .. } => "step_skipped",
            EventPayload::Progress { .. } => "progress",
            EventPayload::WorkflowCompleted { .. } => "workflow_completed",
            EventPayload::AiChunk { .. } => "ai_chunk",
            EventPayload::AiComplete { .. } => "ai_complete",
            EventPayload::AiError { .. } => "ai_error",
            EventPayload::AiInteractionRequired { .. } => "ai_interaction_required",
            EventPayload::AiToolCallStart { .. } => "ai_tool_call_start",
            EventPayload::AiToolCallComplete { .. } => "ai_tool_call_complete",
            EventPayload::AiThinking { .. } => "ai_thinking",
            EventPayload::Heartbeat { .. } => "heartbeat",
            EventPayload::Error { .. } => "error",
            EventPayload::DebugCompleted { .. } => "debug_completed",
        }
    }

    /// Heartbeats are filler; everything else counts as a real event for
    /// keepalive suppression.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, EventPayload::Heartbeat { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventPayload::WorkflowCompleted { .. } | EventPayload::DebugCompleted { .. }
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
