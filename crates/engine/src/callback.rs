// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's callback surface.
//!
//! Success and failure both arrive through `on_step_completed` — one
//! terminal notification per step, discriminated by [`StepStatus`].
//! `on_step_failed` fires additionally on failure as a notification hook;
//! implementations must not count steps there or they will double-count.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a step about to run.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub step_id: String,
    pub step_name: String,
    pub step_type: String,
    /// Id of the enclosing group step, when nested.
    pub parent_id: Option<String>,
    /// Zero-based iteration of the enclosing group, when nested.
    pub iteration: Option<u32>,
}

/// Terminal discriminant for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed,
}

/// The single terminal notification for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step_id: String,
    pub step_name: String,
    pub step_type: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub output: Option<Value>,
    /// Empty on success.
    pub error: String,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// A pause requesting a typed human response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub step_id: String,
    #[serde(default)]
    pub prompt: String,
    /// Seconds to wait; 0 means the host's configured default.
    #[serde(default)]
    pub timeout_secs: u64,
}

/// The human's response, or a skip marker when none arrived in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub skipped: bool,
}

impl InteractionReply {
    pub fn skipped() -> Self {
        Self { value: None, skipped: true }
    }

    pub fn answered(value: Value) -> Self {
        Self { value: Some(value), skipped: false }
    }
}

/// Everything the engine reports while executing a workflow.
///
/// AI hooks default to no-ops so non-observing hosts stay small.
#[async_trait]
pub trait ExecutionCallback: Send + Sync {
    async fn on_step_started(&self, info: &StepInfo);

    /// The one terminal notification per step; counters belong here.
    async fn on_step_completed(&self, outcome: &StepOutcome);

    /// Failure notification hook. Fires before `on_step_completed` on the
    /// failing step. Must not count steps.
    async fn on_step_failed(&self, _step_id: &str, _error: &str) {}

    async fn on_step_skipped(&self, _step_id: &str, _step_name: &str, _reason: &str) {}

    async fn on_progress(&self, _current: u64, _total: u64) {}

    /// Final variable snapshot, before the engine reports terminal state.
    async fn on_execution_complete(&self, _variables: &IndexMap<String, Value>) {}

    async fn on_ai_chunk(&self, _step_id: &str, _content: &str) {}

    async fn on_ai_complete(&self, _step_id: &str, _content: &str) {}

    async fn on_ai_error(&self, _step_id: &str, _error: &str) {}

    async fn on_ai_thinking(&self, _step_id: &str, _round: u32, _content: &str) {}

    async fn on_ai_tool_call_start(&self, _step_id: &str, _tool: &str, _arguments: &Value) {}

    async fn on_ai_tool_call_complete(&self, _step_id: &str, _tool: &str, _result: Option<&Value>) {
    }

    /// Block until the host produces a reply (or decides to skip).
    async fn on_interaction(&self, request: &InteractionRequest) -> InteractionReply;
}

/// Callback for hosts that do not observe execution. Interactions are
/// always skipped.
#[derive(Debug, Clone, Default)]
pub struct NoopCallback;

#[async_trait]
impl ExecutionCallback for NoopCallback {
    async fn on_step_started(&self, _info: &StepInfo) {}

    async fn on_step_completed(&self, _outcome: &StepOutcome) {}

    async fn on_interaction(&self, _request: &InteractionRequest) -> InteractionReply {
        InteractionReply::skipped()
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
