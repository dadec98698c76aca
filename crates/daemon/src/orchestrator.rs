// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session orchestrator: the public execution API.
//!
//! Owns the engine handle, session registry, slave directory, and config
//! as one explicit value constructed at startup. Every accepted request
//! gets a session, a cancel scope bounded by the request deadline, and —
//! on every exit path — exactly one terminal `workflow_completed` followed
//! by writer close and unregistration.

use crate::callback::SessionCallback;
use crate::env::OrchestratorConfig;
use crate::local::execute_local;
use crate::sessions::{Session, SessionRegistry};
use crate::slave::{
    driver::execute_remote, SlaveClient, SlaveDirectory, SlaveExecuteRequest, SlaveState,
};
use crate::stream::EventStreamWriter;
use fl_core::{Clock, FlowError, SessionId, SessionStatus, Workflow};
use fl_engine::{Engine, InteractionReply};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

/// Where a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorType {
    #[default]
    Local,
    Remote,
}

/// One execution request, independent of the workflow document it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_id: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub executor_type: ExecutorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<String>,
}

/// Terminal accounting for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub session_id: String,
    pub status: String,
    pub total_steps: u64,
    pub success_steps: u64,
    pub failed_steps: u64,
    pub duration_ms: u64,
}

/// The orchestrator fabric, constructed once at startup.
pub struct Orchestrator<C: Clock> {
    engine: Option<Arc<Engine>>,
    sessions: Arc<SessionRegistry<C>>,
    slaves: Arc<SlaveDirectory>,
    config: OrchestratorConfig,
    clock: C,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(engine: Option<Arc<Engine>>, config: OrchestratorConfig, clock: C) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            clock.clone(),
            config.interaction_default_timeout,
        ));
        Self {
            engine,
            sessions,
            slaves: Arc::new(SlaveDirectory::new()),
            config,
            clock,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry<C>> {
        &self.sessions
    }

    pub fn slaves(&self) -> &Arc<SlaveDirectory> {
        &self.slaves
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Execute with a fresh session id, streaming events into `sink`.
    pub async fn execute_stream(
        &self,
        request: ExecuteRequest,
        workflow: Workflow,
        sink: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> Result<ExecutionSummary, FlowError> {
        let writer = Arc::new(EventStreamWriter::new(
            SessionId::generate(),
            sink,
            self.clock.clone(),
        ));
        self.execute_with_writer(request, workflow, writer).await
    }

    /// Identical pipeline with writes discarded; returns the summary.
    /// Remote requests use the slave's synchronous variant directly.
    pub async fn execute_blocking(
        &self,
        request: ExecuteRequest,
        workflow: Workflow,
    ) -> Result<ExecutionSummary, FlowError> {
        if request.executor_type == ExecutorType::Remote {
            return self.execute_blocking_remote(request, workflow).await;
        }
        let writer = Arc::new(EventStreamWriter::discarding(
            SessionId::generate(),
            self.clock.clone(),
        ));
        self.execute_with_writer(request, workflow, writer).await
    }

    async fn execute_blocking_remote(
        &self,
        request: ExecuteRequest,
        mut workflow: Workflow,
    ) -> Result<ExecutionSummary, FlowError> {
        let info = self.resolve_slave(&request)?;
        workflow.merge_variables(&request.variables);
        let slave_request = SlaveExecuteRequest {
            session_id: SessionId::generate().to_string(),
            workflow,
            variables: IndexMap::new(),
            timeout_secs: request.timeout_secs,
            interaction_url: None,
        };
        SlaveClient::execute_blocking(&info.address, &slave_request).await
    }

    /// Execute keyed by the writer's session id. The slave host reuses
    /// this entry point with the master's session id.
    pub async fn execute_with_writer(
        &self,
        request: ExecuteRequest,
        mut workflow: Workflow,
        writer: Arc<EventStreamWriter<C>>,
    ) -> Result<ExecutionSummary, FlowError> {
        // Failures before a session exists surface as a single error event
        // on the stream, which then closes.
        if let Err(e) = self.preflight(&request, &workflow) {
            let _ = writer.write_error(e.code(), e.to_string(), None).await;
            writer.close().await;
            return Err(e);
        }

        let session = match self.sessions.create(&request.workflow_id, Arc::clone(&writer)) {
            Ok(session) => session,
            Err(e) => {
                // Conflicting create: fail this caller's stream and leave
                // the registered session untouched.
                let _ = writer.write_error(e.code(), e.to_string(), None).await;
                writer.close().await;
                return Err(e);
            }
        };
        let session_id = session.id();
        session.set_environment(request.variables.clone());
        workflow.merge_variables(&request.variables);

        let cancel = CancellationToken::new();
        session.set_cancel(cancel.clone());
        let callback = Arc::new(SessionCallback::new(Arc::clone(&self.sessions), session_id));

        let deadline = self.config.deadline(request.timeout_secs);
        tracing::info!(
            session_id = %session_id,
            workflow_id = %request.workflow_id,
            executor = ?request.executor_type,
            "execution accepted"
        );

        let drive = self.dispatch(&request, workflow, &session, Arc::clone(&callback), &cancel);
        let result = tokio::select! {
            result = drive => result,
            _ = tokio::time::sleep(deadline) => Err(FlowError::Timeout),
        };

        self.finalize(&session, &callback, &cancel, result).await
    }

    /// Pre-session checks: document shape, engine presence, slave state.
    fn preflight(&self, request: &ExecuteRequest, workflow: &Workflow) -> Result<(), FlowError> {
        workflow.validate()?;
        match request.executor_type {
            ExecutorType::Local => {
                if self.engine.is_none() {
                    return Err(FlowError::Executor("engine not initialized".into()));
                }
            }
            ExecutorType::Remote => {
                self.resolve_slave(request)?;
            }
        }
        Ok(())
    }

    fn resolve_slave(&self, request: &ExecuteRequest) -> Result<crate::slave::SlaveInfo, FlowError> {
        let slave_id = request
            .slave_id
            .as_deref()
            .ok_or_else(|| FlowError::InvalidInput("remote execution requires slave_id".into()))?;
        let info = self
            .slaves
            .get(slave_id)
            .ok_or_else(|| FlowError::SlaveUnavailable(slave_id.to_string()))?;
        if info.state != SlaveState::Online {
            return Err(FlowError::SlaveUnavailable(slave_id.to_string()));
        }
        Ok(info)
    }

    async fn dispatch(
        &self,
        request: &ExecuteRequest,
        workflow: Workflow,
        session: &Arc<Session<C>>,
        callback: Arc<SessionCallback<C>>,
        cancel: &CancellationToken,
    ) -> Result<SessionStatus, FlowError> {
        match request.executor_type {
            ExecutorType::Local => {
                let engine = self
                    .engine
                    .as_ref()
                    .ok_or_else(|| FlowError::Executor("engine not initialized".into()))?;
                execute_local(
                    engine,
                    session,
                    workflow,
                    callback,
                    &self.config,
                    cancel.clone(),
                )
                .await
            }
            ExecutorType::Remote => {
                let slave_id = request
                    .slave_id
                    .as_deref()
                    .ok_or_else(|| FlowError::InvalidInput("remote execution requires slave_id".into()))?;
                execute_remote(
                    &self.sessions,
                    session,
                    &self.slaves,
                    slave_id,
                    workflow,
                    request.timeout_secs,
                    &self.config,
                    cancel.clone(),
                )
                .await
            }
        }
    }

    /// Every exit path lands here: cancel the scope, settle the terminal
    /// status, emit the one terminal event, and clean up.
    async fn finalize(
        &self,
        session: &Arc<Session<C>>,
        callback: &SessionCallback<C>,
        cancel: &CancellationToken,
        result: Result<SessionStatus, FlowError>,
    ) -> Result<ExecutionSummary, FlowError> {
        cancel.cancel();
        let session_id = session.id();

        let status = match &result {
            Ok(status) => *status,
            Err(FlowError::Cancelled) => SessionStatus::Stopped,
            Err(FlowError::Timeout) => {
                if !session.terminal_emitted() {
                    let _ = session
                        .writer()
                        .write_error(fl_core::ErrorCode::Timeout, "deadline exceeded", None)
                        .await;
                }
                SessionStatus::Failed
            }
            Err(e) => {
                if !session.terminal_emitted() {
                    let _ = session
                        .writer()
                        .write_error(e.code(), e.to_string(), None)
                        .await;
                }
                SessionStatus::Failed
            }
        };
        // A stop that raced the driver always wins.
        let status = if session.status() == SessionStatus::Stopped {
            SessionStatus::Stopped
        } else {
            status
        };

        session.set_status(status);
        callback.emit_terminal(status).await;

        let counters = session.counters();
        let summary = ExecutionSummary {
            session_id: session_id.to_string(),
            status: status.wire_status().to_string(),
            total_steps: counters.total_steps,
            success_steps: counters.success_steps,
            failed_steps: counters.failed_steps,
            duration_ms: session.elapsed_ms(),
        };
        self.sessions.cleanup(&session_id).await;
        tracing::info!(
            session_id = %session_id,
            status = %summary.status,
            total = summary.total_steps,
            failed = summary.failed_steps,
            duration_ms = summary.duration_ms,
            "execution finished"
        );
        Ok(summary)
    }

    /// Delegate a stop to the registry. Idempotent while the session lives.
    pub fn stop(&self, session_id: &SessionId) -> Result<(), FlowError> {
        self.sessions.stop(session_id)
    }

    /// Accept a client's interaction reply for a waiting session.
    pub fn submit_interaction(
        &self,
        session_id: &SessionId,
        step_id: &str,
        reply: InteractionReply,
    ) -> Result<(), FlowError> {
        tracing::debug!(session_id = %session_id, step_id, skipped = reply.skipped, "interaction submitted");
        self.sessions.submit_interaction(session_id, reply)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
