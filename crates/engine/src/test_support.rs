// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording callback for engine and daemon tests.

use crate::callback::{
    ExecutionCallback, InteractionReply, InteractionRequest, StepInfo, StepOutcome, StepStatus,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Records every callback invocation as a compact string, in order.
#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<String>>,
    requests: Mutex<Vec<InteractionRequest>>,
    reply: Mutex<InteractionReply>,
    variables: Mutex<IndexMap<String, Value>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply returned from every `on_interaction`.
    pub fn with_reply(reply: InteractionReply) -> Self {
        Self { reply: Mutex::new(reply), ..Self::default() }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn requests(&self) -> Vec<InteractionRequest> {
        self.requests.lock().clone()
    }

    pub fn final_variables(&self) -> IndexMap<String, Value> {
        self.variables.lock().clone()
    }

    fn push(&self, entry: impl Into<String>) {
        self.events.lock().push(entry.into());
    }
}

#[async_trait]
impl ExecutionCallback for RecordingCallback {
    async fn on_step_started(&self, info: &StepInfo) {
        match (&info.parent_id, info.iteration) {
            (Some(parent), Some(i)) => {
                self.push(format!("started:{}@{}[{}]", info.step_id, parent, i))
            }
            _ => self.push(format!("started:{}", info.step_id)),
        }
    }

    async fn on_step_completed(&self, outcome: &StepOutcome) {
        let tag = match outcome.status {
            StepStatus::Success => "ok",
            StepStatus::Failed => "err",
        };
        self.push(format!("completed:{}:{}", outcome.step_id, tag));
    }

    async fn on_step_failed(&self, step_id: &str, _error: &str) {
        self.push(format!("failed_hook:{step_id}"));
    }

    async fn on_step_skipped(&self, step_id: &str, _step_name: &str, reason: &str) {
        self.push(format!("skipped:{step_id}:{reason}"));
    }

    async fn on_progress(&self, current: u64, total: u64) {
        self.push(format!("progress:{current}/{total}"));
    }

    async fn on_execution_complete(&self, variables: &IndexMap<String, Value>) {
        *self.variables.lock() = variables.clone();
        self.push("execution_complete");
    }

    async fn on_ai_chunk(&self, step_id: &str, content: &str) {
        self.push(format!("ai_chunk:{step_id}:{content}"));
    }

    async fn on_ai_complete(&self, step_id: &str, _content: &str) {
        self.push(format!("ai_complete:{step_id}"));
    }

    async fn on_ai_error(&self, step_id: &str, error: &str) {
        self.push(format!("ai_error:{step_id}:{error}"));
    }

    async fn on_ai_thinking(&self, step_id: &str, round: u32, _content: &str) {
        self.push(format!("ai_thinking:{step_id}:{round}"));
    }

    async fn on_ai_tool_call_start(&self, step_id: &str, tool: &str, _arguments: &Value) {
        self.push(format!("ai_tool_start:{step_id}:{tool}"));
    }

    async fn on_ai_tool_call_complete(&self, step_id: &str, tool: &str, _result: Option<&Value>) {
        self.push(format!("ai_tool_complete:{step_id}:{tool}"));
    }

    async fn on_interaction(&self, request: &InteractionRequest) -> InteractionReply {
        self.push(format!("interaction:{}", request.step_id));
        self.requests.lock().push(request.clone());
        self.reply.lock().clone()
    }
}
