// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed executions.
//!
//! `submit` spawns the run loop and tracks it by [`ExecutionId`]; hosts
//! poll `status` and `abort`/`remove` as needed. `run` executes inline for
//! hosts that own their own task (blocking path, master executor).

use crate::callback::ExecutionCallback;
use crate::execution::{run_workflow, ExecutionOutcome};
use crate::handler::HandlerRegistry;
use fl_core::Workflow;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Id family for managed executions.
pub enum ExecutionKind {}

impl fl_core::IdKind for ExecutionKind {
    const PREFIX: &'static str = "exe-";
}

/// Unique identifier for one managed execution.
pub type ExecutionId = fl_core::TypedId<ExecutionKind>;

/// Observable state of a managed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    Completed,
    Failed,
    Aborted,
}

struct ExecutionHandle {
    state: ExecutionState,
    cancel: CancellationToken,
    first_error: Option<String>,
}

/// The embedded step engine.
pub struct Engine {
    handlers: Arc<HandlerRegistry>,
    executions: Arc<Mutex<HashMap<ExecutionId, ExecutionHandle>>>,
}

impl Engine {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self {
            handlers: Arc::new(handlers),
            executions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run a workflow on the caller's task.
    pub async fn run(
        &self,
        workflow: &Workflow,
        callback: Arc<dyn ExecutionCallback>,
        cancel: CancellationToken,
    ) -> ExecutionOutcome {
        run_workflow(workflow, &self.handlers, callback, cancel).await
    }

    /// Spawn a managed run and return its id for status polling.
    pub fn submit(
        &self,
        workflow: Workflow,
        callback: Arc<dyn ExecutionCallback>,
    ) -> ExecutionId {
        let id = ExecutionId::generate();
        let cancel = CancellationToken::new();
        self.executions.lock().insert(
            id,
            ExecutionHandle {
                state: ExecutionState::Running,
                cancel: cancel.clone(),
                first_error: None,
            },
        );

        let handlers = Arc::clone(&self.handlers);
        let executions = Arc::clone(&self.executions);
        tokio::spawn(async move {
            let outcome = run_workflow(&workflow, &handlers, callback, cancel).await;
            tracing::debug!(execution_id = %id, state = ?outcome.state, "execution finished");
            if let Some(handle) = executions.lock().get_mut(&id) {
                handle.state = outcome.state;
                handle.first_error = outcome.first_error;
            }
        });
        id
    }

    pub fn status(&self, id: &ExecutionId) -> Option<ExecutionState> {
        self.executions.lock().get(id).map(|h| h.state)
    }

    pub fn first_error(&self, id: &ExecutionId) -> Option<String> {
        self.executions.lock().get(id).and_then(|h| h.first_error.clone())
    }

    /// Request cooperative abort; the run loop stops at its next check.
    pub fn abort(&self, id: &ExecutionId) {
        if let Some(handle) = self.executions.lock().get(id) {
            handle.cancel.cancel();
        }
    }

    /// Drop bookkeeping for a finished execution.
    pub fn remove(&self, id: &ExecutionId) {
        self.executions.lock().remove(id);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
