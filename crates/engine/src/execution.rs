// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run loop.
//!
//! Walks the step tree in document order, descending into sub-steps once
//! per iteration with parent linkage. Callbacks fire from this task, so
//! per-execution callback order equals invocation order.

use crate::callback::{ExecutionCallback, StepInfo, StepOutcome, StepStatus};
use crate::engine::ExecutionState;
use crate::handler::{HandlerRegistry, StepContext};
use fl_core::{FlowError, OnErrorPolicy, Step, Workflow};
use indexmap::IndexMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of one workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub state: ExecutionState,
    /// First step error encountered, when any step failed.
    pub first_error: Option<String>,
    /// Final variable snapshot.
    pub variables: IndexMap<String, Value>,
}

/// Walk verdict after a step or group.
enum Walk {
    Continue,
    /// Abort policy tripped; stop the walk, run is failed.
    Break,
    /// Cancelled mid-step; stop immediately, no further notifications.
    Cancelled,
}

struct RunState<'a> {
    handlers: &'a HandlerRegistry,
    callback: &'a Arc<dyn ExecutionCallback>,
    cancel: &'a CancellationToken,
    total: u64,
    done: u64,
    failed_any: bool,
    first_error: Option<String>,
    variables: IndexMap<String, Value>,
}

/// Execute `workflow` to completion, reporting through `callback`.
pub async fn run_workflow(
    workflow: &Workflow,
    handlers: &HandlerRegistry,
    callback: Arc<dyn ExecutionCallback>,
    cancel: CancellationToken,
) -> ExecutionOutcome {
    let mut state = RunState {
        handlers,
        callback: &callback,
        cancel: &cancel,
        total: workflow.leaf_count(),
        done: 0,
        failed_any: false,
        first_error: None,
        variables: workflow.variables.clone(),
    };

    run_steps(&mut state, &workflow.steps, None, None).await;

    callback.on_execution_complete(&state.variables).await;

    let outcome_state = if cancel.is_cancelled() {
        ExecutionState::Aborted
    } else if state.failed_any {
        ExecutionState::Failed
    } else {
        ExecutionState::Completed
    };
    ExecutionOutcome {
        state: outcome_state,
        first_error: state.first_error,
        variables: state.variables,
    }
}

/// Recursion through sub-step groups needs boxing.
fn run_steps<'a, 'b: 'a>(
    state: &'a mut RunState<'b>,
    steps: &'a [Step],
    parent: Option<&'a str>,
    iteration: Option<u32>,
) -> Pin<Box<dyn Future<Output = Walk> + Send + 'a>> {
    Box::pin(async move {
        for step in steps {
            if state.cancel.is_cancelled() {
                return Walk::Cancelled;
            }
            let walk = if step.sub_steps.is_empty() {
                run_leaf(state, step, parent, iteration).await
            } else {
                run_group(state, step).await
            };
            match walk {
                Walk::Continue => {}
                stop => return stop,
            }
        }
        Walk::Continue
    })
}

/// Groups emit no events of their own; their children carry the linkage.
async fn run_group(state: &mut RunState<'_>, group: &Step) -> Walk {
    for iteration in 0..group.iterations.max(1) {
        match run_steps(state, &group.sub_steps, Some(&group.id), Some(iteration)).await {
            Walk::Continue => {}
            stop => return stop,
        }
    }
    Walk::Continue
}

async fn run_leaf(
    state: &mut RunState<'_>,
    step: &Step,
    parent: Option<&str>,
    iteration: Option<u32>,
) -> Walk {
    if step.params.get("disabled").and_then(Value::as_bool).unwrap_or(false) {
        state
            .callback
            .on_step_skipped(&step.id, &step.name, "step disabled")
            .await;
        // A skipped leaf still advances progress; the bar must reach the
        // full leaf count even when some leaves never run.
        state.done += 1;
        state.callback.on_progress(state.done, state.total).await;
        return Walk::Continue;
    }

    let info = StepInfo {
        step_id: step.id.clone(),
        step_name: step.name.clone(),
        step_type: step.step_type.clone(),
        parent_id: parent.map(str::to_string),
        iteration,
    };
    state.callback.on_step_started(&info).await;

    let started = Instant::now();
    let result = {
        let RunState { handlers, callback, cancel, variables, .. } = state;
        match handlers.get(&step.step_type) {
            Some(handler) => {
                let ctx = StepContext {
                    step,
                    variables,
                    callback: callback.as_ref(),
                    cancel: *cancel,
                };
                handler.run(ctx).await
            }
            None => Err(FlowError::Executor(format!(
                "no handler for step type: {}",
                step.step_type
            ))),
        }
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(output) => {
            state.done += 1;
            let outcome = StepOutcome {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                step_type: step.step_type.clone(),
                status: StepStatus::Success,
                duration_ms,
                output,
                error: String::new(),
            };
            state.callback.on_step_completed(&outcome).await;
            state.callback.on_progress(state.done, state.total).await;
            Walk::Continue
        }
        Err(FlowError::Cancelled) => Walk::Cancelled,
        Err(err) => {
            let error = err.to_string();
            tracing::debug!(step_id = %step.id, %error, "step failed");
            state.done += 1;
            state.failed_any = true;
            if state.first_error.is_none() {
                state.first_error = Some(error.clone());
            }
            state.callback.on_step_failed(&step.id, &error).await;
            let outcome = StepOutcome {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                step_type: step.step_type.clone(),
                status: StepStatus::Failed,
                duration_ms,
                output: None,
                error,
            };
            state.callback.on_step_completed(&outcome).await;
            state.callback.on_progress(state.done, state.total).await;
            match step.effective_policy() {
                OnErrorPolicy::Abort => Walk::Break,
                OnErrorPolicy::Continue => Walk::Continue,
            }
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
