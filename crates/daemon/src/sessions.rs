// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: the set of live debug sessions.
//!
//! The registry map sits behind a reader/writer lock; each session's
//! mutable state sits behind that session's own mutex. The interaction
//! rendezvous is a capacity-1 channel: submitters never block (try_send),
//! the waiter selects over the slot, cancellation, and a timeout.

use crate::stream::EventStreamWriter;
use fl_core::{
    Clock, FlowError, SessionId, SessionStatus, StepCounters, StepExecutionResult,
};
use fl_engine::InteractionReply;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct SessionState {
    status: SessionStatus,
    cancel: Option<CancellationToken>,
    counters: StepCounters,
    step_results: Vec<StepExecutionResult>,
    variables: IndexMap<String, Value>,
    environment: IndexMap<String, Value>,
    last_error: Option<String>,
    terminal_emitted: bool,
}

impl<C: Clock> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("workflow_id", &self.workflow_id)
            .finish()
    }
}

/// One live debug session.
pub struct Session<C: Clock> {
    id: SessionId,
    workflow_id: String,
    clock: C,
    started_at: Instant,
    state: Mutex<SessionState>,
    writer: Arc<EventStreamWriter<C>>,
    interaction_tx: mpsc::Sender<InteractionReply>,
    interaction_rx: tokio::sync::Mutex<mpsc::Receiver<InteractionReply>>,
}

impl<C: Clock> Session<C> {
    fn new(workflow_id: String, writer: Arc<EventStreamWriter<C>>, clock: C) -> Self {
        let (interaction_tx, interaction_rx) = mpsc::channel(1);
        Self {
            id: writer.session_id(),
            workflow_id,
            started_at: clock.now(),
            clock,
            state: Mutex::new(SessionState {
                status: SessionStatus::Running,
                cancel: None,
                counters: StepCounters::default(),
                step_results: Vec::new(),
                variables: IndexMap::new(),
                environment: IndexMap::new(),
                last_error: None,
                terminal_emitted: false,
            }),
            writer,
            interaction_tx,
            interaction_rx: tokio::sync::Mutex::new(interaction_rx),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn writer(&self) -> &Arc<EventStreamWriter<C>> {
        &self.writer
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    /// Status moves forward only; a terminal status is never overwritten.
    pub fn set_status(&self, status: SessionStatus) {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return;
        }
        state.status = status;
    }

    pub fn set_cancel(&self, token: CancellationToken) {
        self.state.lock().cancel = Some(token);
    }

    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.state.lock().cancel.clone()
    }

    /// Set `stopped` and cancel the execution scope.
    pub fn stop(&self) {
        let cancel = {
            let mut state = self.state.lock();
            if !state.status.is_terminal() {
                state.status = SessionStatus::Stopped;
            }
            state.cancel.clone()
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
    }

    /// Record one terminal step notification: counters plus the immutable
    /// result record, under one lock.
    pub fn record_step(&self, result: StepExecutionResult) {
        let mut state = self.state.lock();
        state.counters.record(result.success);
        if !result.success && state.last_error.is_none() {
            state.last_error = Some(result.error.clone());
        }
        state.step_results.push(result);
    }

    pub fn counters(&self) -> StepCounters {
        self.state.lock().counters
    }

    pub fn step_results(&self) -> Vec<StepExecutionResult> {
        self.state.lock().step_results.clone()
    }

    pub fn set_variables(&self, variables: IndexMap<String, Value>) {
        self.state.lock().variables = variables;
    }

    pub fn variables(&self) -> IndexMap<String, Value> {
        self.state.lock().variables.clone()
    }

    pub fn set_environment(&self, environment: IndexMap<String, Value>) {
        self.state.lock().environment = environment;
    }

    pub fn environment(&self) -> IndexMap<String, Value> {
        self.state.lock().environment.clone()
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        if state.last_error.is_none() {
            state.last_error = Some(message.into());
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Adopt a remote executor's terminal summary.
    pub fn adopt_summary(&self, counters: StepCounters, status: SessionStatus) {
        let mut state = self.state.lock();
        state.counters = counters;
        if !state.status.is_terminal() {
            state.status = status;
        }
    }

    /// Claims the right to emit the terminal event. True exactly once.
    pub fn take_terminal(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.terminal_emitted, true)
    }

    pub fn terminal_emitted(&self) -> bool {
        self.state.lock().terminal_emitted
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.started_at)
            .as_millis() as u64
    }
}

/// How a `wait_for_interaction` ended.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionWait {
    Replied(InteractionReply),
    TimedOut,
    Cancelled,
}

impl InteractionWait {
    /// The reply to hand to the executor; timeouts and cancellation both
    /// read as a skip.
    pub fn into_reply(self) -> InteractionReply {
        match self {
            InteractionWait::Replied(reply) => reply,
            InteractionWait::TimedOut | InteractionWait::Cancelled => InteractionReply::skipped(),
        }
    }
}

/// Owns the set of live sessions.
pub struct SessionRegistry<C: Clock> {
    sessions: RwLock<HashMap<SessionId, Arc<Session<C>>>>,
    clock: C,
    interaction_default: Duration,
}

impl<C: Clock> SessionRegistry<C> {
    pub fn new(clock: C, interaction_default: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            interaction_default,
        }
    }

    /// Atomic create-if-absent, keyed by the writer's session id.
    pub fn create(
        &self,
        workflow_id: &str,
        writer: Arc<EventStreamWriter<C>>,
    ) -> Result<Arc<Session<C>>, FlowError> {
        let id = writer.session_id();
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(FlowError::SessionConflict(id));
        }
        let session = Arc::new(Session::new(
            workflow_id.to_string(),
            writer,
            self.clock.clone(),
        ));
        sessions.insert(id, Arc::clone(&session));
        tracing::debug!(session_id = %id, workflow_id, "session created");
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session<C>>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn set_cancel(&self, id: &SessionId, token: CancellationToken) -> Result<(), FlowError> {
        let session = self.get(id).ok_or(FlowError::SessionNotFound(*id))?;
        session.set_cancel(token);
        Ok(())
    }

    pub fn set_status(&self, id: &SessionId, status: SessionStatus) -> Result<(), FlowError> {
        let session = self.get(id).ok_or(FlowError::SessionNotFound(*id))?;
        session.set_status(status);
        Ok(())
    }

    /// Stop a session: status `stopped`, execution scope cancelled.
    /// Idempotent while the session is registered.
    pub fn stop(&self, id: &SessionId) -> Result<(), FlowError> {
        let session = self.get(id).ok_or(FlowError::SessionNotFound(*id))?;
        session.stop();
        tracing::info!(session_id = %id, "session stop requested");
        Ok(())
    }

    /// Non-blocking hand-off of one interaction reply. Accepted only while
    /// the session is waiting and the slot is free.
    pub fn submit_interaction(
        &self,
        id: &SessionId,
        reply: InteractionReply,
    ) -> Result<(), FlowError> {
        let session = self.get(id).ok_or(FlowError::SessionNotFound(*id))?;
        if session.status() != SessionStatus::WaitingInteraction {
            return Err(FlowError::SessionClosed(*id));
        }
        session
            .interaction_tx
            .try_send(reply)
            .map_err(|_| FlowError::InvalidInput("interaction slot occupied".into()))
    }

    /// Execution-side wait for a reply. The session shows
    /// `waiting_interaction` for the duration and returns to `running` on
    /// any exit. A zero timeout means the configured default.
    pub async fn wait_for_interaction(
        &self,
        id: &SessionId,
        timeout: Duration,
    ) -> InteractionWait {
        let Some(session) = self.get(id) else {
            return InteractionWait::Cancelled;
        };
        let timeout = if timeout.is_zero() {
            self.interaction_default
        } else {
            timeout
        };
        session.set_status(SessionStatus::WaitingInteraction);

        let cancel = session.cancel_token().unwrap_or_default();
        let outcome = {
            let mut rx = session.interaction_rx.lock().await;
            tokio::select! {
                reply = rx.recv() => match reply {
                    Some(reply) => InteractionWait::Replied(reply),
                    None => InteractionWait::Cancelled,
                },
                _ = cancel.cancelled() => InteractionWait::Cancelled,
                _ = tokio::time::sleep(timeout) => InteractionWait::TimedOut,
            }
        };

        session.set_status(SessionStatus::Running);
        tracing::debug!(session_id = %id, outcome = ?outcome, "interaction wait finished");
        outcome
    }

    /// Close the writer and unregister. Idempotent.
    pub async fn cleanup(&self, id: &SessionId) {
        let session = self.sessions.write().remove(id);
        if let Some(session) = session {
            session.writer.close().await;
            tracing::debug!(session_id = %id, "session cleaned up");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
