// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master executor: the bidirectional alternative to the streaming path.
//!
//! Steps through the workflow one step at a time, submitting each as a
//! single-step synthetic workflow to the engine, and fans results out to
//! every observer of the session. The terminal frame is `debug_completed`
//! with the full ordered result list.

use crate::hub::FanoutHub;
use async_trait::async_trait;
use fl_core::{
    Clock, Event, EventPayload, OnErrorPolicy, SessionId, StepExecutionResult, Workflow,
};
use fl_engine::{
    Engine, ExecutionCallback, ExecutionState, InteractionReply, InteractionRequest, StepInfo,
    StepOutcome, StepStatus,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives workflows step by step, broadcasting through the hub.
pub struct MasterExecutor<C: Clock> {
    engine: Arc<Engine>,
    hub: Arc<FanoutHub>,
    clock: C,
}

impl<C: Clock> MasterExecutor<C> {
    pub fn new(engine: Arc<Engine>, hub: Arc<FanoutHub>, clock: C) -> Self {
        Self { engine, hub, clock }
    }

    pub fn hub(&self) -> &Arc<FanoutHub> {
        &self.hub
    }

    fn stamp(&self, session_id: SessionId, payload: EventPayload) -> Event {
        let mut event = Event::for_session(session_id, payload);
        event.timestamp = self.clock.epoch_ms();
        event
    }

    /// Run `workflow` for `session_id`, one top-level step per engine
    /// submission. Returns the accumulated step results.
    pub async fn execute(
        &self,
        session_id: SessionId,
        mut workflow: Workflow,
        cancel: CancellationToken,
    ) -> Vec<StepExecutionResult> {
        let total = workflow.steps.len() as u64;
        let steps = std::mem::take(&mut workflow.steps);
        let mut variables = workflow.variables.clone();
        let mut results: Vec<StepExecutionResult> = Vec::new();
        let mut failed = false;

        for (index, step) in steps.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let policy = step.effective_policy();
            let single = Workflow {
                id: workflow.id.clone(),
                name: workflow.name.clone(),
                variables: variables.clone(),
                steps: vec![step],
                options: workflow.options.clone(),
            };
            let callback = Arc::new(HubCallback {
                hub: Arc::clone(&self.hub),
                session_id,
                epoch_ms: self.clock.epoch_ms(),
                results: Mutex::new(Vec::new()),
            });
            let outcome = self
                .engine
                .run(&single, callback.clone(), cancel.clone())
                .await;
            variables = outcome.variables;
            results.extend(callback.take_results());

            let current = index as u64 + 1;
            self.hub.broadcast(
                &session_id,
                &self.stamp(
                    session_id,
                    EventPayload::Progress {
                        current,
                        total,
                        percentage: if total > 0 { current * 100 / total } else { 0 },
                    },
                ),
            );

            if outcome.state != ExecutionState::Completed {
                failed = true;
                // Continue only when the failing step explicitly says so
                if policy == OnErrorPolicy::Abort {
                    break;
                }
                if outcome.state == ExecutionState::Aborted {
                    break;
                }
            }
        }

        let status = if failed { "failed" } else { "success" };
        self.hub.broadcast(
            &session_id,
            &self.stamp(
                session_id,
                EventPayload::DebugCompleted {
                    status: status.to_string(),
                    step_results: results.clone(),
                },
            ),
        );
        tracing::info!(session_id = %session_id, status, steps = results.len(), "debug run finished");
        results
    }
}

/// Callback that fans engine notifications out through the hub and
/// accumulates result records.
struct HubCallback {
    hub: Arc<FanoutHub>,
    session_id: SessionId,
    epoch_ms: u64,
    results: Mutex<Vec<StepExecutionResult>>,
}

impl HubCallback {
    fn take_results(&self) -> Vec<StepExecutionResult> {
        std::mem::take(&mut self.results.lock())
    }

    fn broadcast(&self, payload: EventPayload) {
        let mut event = Event::for_session(self.session_id, payload);
        event.timestamp = self.epoch_ms;
        self.hub.broadcast(&self.session_id, &event);
    }
}

#[async_trait]
impl ExecutionCallback for HubCallback {
    async fn on_step_started(&self, info: &StepInfo) {
        self.broadcast(EventPayload::StepStarted {
            step_id: info.step_id.clone(),
            step_name: info.step_name.clone(),
            step_type: info.step_type.clone(),
            parent_id: info.parent_id.clone(),
            iteration: info.iteration,
        });
    }

    async fn on_step_completed(&self, outcome: &StepOutcome) {
        self.results.lock().push(StepExecutionResult {
            step_id: outcome.step_id.clone(),
            step_name: outcome.step_name.clone(),
            step_type: outcome.step_type.clone(),
            success: outcome.success(),
            duration_ms: outcome.duration_ms,
            output: outcome.output.clone(),
            error: outcome.error.clone(),
        });
        match outcome.status {
            StepStatus::Success => self.broadcast(EventPayload::StepCompleted {
                step_id: outcome.step_id.clone(),
                step_name: outcome.step_name.clone(),
                success: true,
                duration_ms: outcome.duration_ms,
                output: outcome.output.clone(),
            }),
            StepStatus::Failed => self.broadcast(EventPayload::StepFailed {
                step_id: outcome.step_id.clone(),
                step_name: outcome.step_name.clone(),
                error: outcome.error.clone(),
                duration_ms: outcome.duration_ms,
            }),
        }
    }

    // The master broadcasts whole-workflow progress itself.
    async fn on_progress(&self, _current: u64, _total: u64) {}

    // Bidirectional interaction is not brokered in master mode.
    async fn on_interaction(&self, _request: &InteractionRequest) -> InteractionReply {
        InteractionReply::skipped()
    }
}

#[cfg(test)]
#[path = "master_tests.rs"]
mod tests;
