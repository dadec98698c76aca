// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local executor: drives the embedded engine for one session.
//!
//! Submits the workflow, keeps a heartbeat on the stream, and polls the
//! engine for terminal state. Step callbacks flow through the adapter
//! concurrently with polling; the poll loop only decides the terminal
//! transition.

use crate::env::OrchestratorConfig;
use crate::sessions::Session;
use fl_core::{Clock, FlowError, SessionStatus, Workflow};
use fl_engine::{Engine, ExecutionCallback, ExecutionId, ExecutionState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run `workflow` on the embedded engine and return the session's terminal
/// status. Cancellation (via `stop` or the scope) surfaces as
/// `FlowError::Cancelled`.
pub async fn execute_local<C: Clock>(
    engine: &Arc<Engine>,
    session: &Arc<Session<C>>,
    workflow: Workflow,
    callback: Arc<dyn ExecutionCallback>,
    config: &OrchestratorConfig,
    cancel: CancellationToken,
) -> Result<SessionStatus, FlowError> {
    let execution_id = engine.submit(workflow, callback);
    tracing::debug!(session_id = %session.id(), %execution_id, "local execution submitted");

    // If the scope dies while this future is dropped (deadline, stop), the
    // watcher still aborts the engine run.
    let abort_watch = {
        let engine = Arc::clone(engine);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            engine.abort(&execution_id);
            engine.remove(&execution_id);
        })
    };

    // Heartbeat until the scope ends; a broken writer ends it early. The
    // in-flight write always completes, so records never tear.
    let heartbeat_cancel = cancel.child_token();
    let heartbeat = {
        let session = Arc::clone(session);
        let interval = config.heartbeat_interval_local;
        let token = heartbeat_cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if session.writer().write_heartbeat().await.is_err() {
                            break;
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        })
    };

    let result = poll_engine(engine, session, &execution_id, config, &cancel).await;

    heartbeat_cancel.cancel();
    let _ = heartbeat.await;
    abort_watch.abort();
    engine.remove(&execution_id);
    result
}

async fn poll_engine<C: Clock>(
    engine: &Engine,
    session: &Arc<Session<C>>,
    execution_id: &ExecutionId,
    config: &OrchestratorConfig,
    cancel: &CancellationToken,
) -> Result<SessionStatus, FlowError> {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = cancel.cancelled() => {
                engine.abort(execution_id);
                return Err(FlowError::Cancelled);
            }
        }

        if session.status() == SessionStatus::Stopped {
            engine.abort(execution_id);
            return Err(FlowError::Cancelled);
        }

        match engine.status(execution_id) {
            Some(ExecutionState::Running) => {}
            Some(ExecutionState::Completed) => return Ok(SessionStatus::Completed),
            Some(ExecutionState::Failed) => {
                let error = engine
                    .first_error(execution_id)
                    .unwrap_or_else(|| "workflow failed".to_string());
                session.record_error(&error);
                tracing::debug!(session_id = %session.id(), error, "local execution failed");
                return Ok(SessionStatus::Failed);
            }
            Some(ExecutionState::Aborted) => return Err(FlowError::Cancelled),
            None => {
                return Err(FlowError::Executor("execution vanished while polling".into()))
            }
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
