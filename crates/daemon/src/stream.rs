// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event stream writer: one session, one ordered byte stream.
//!
//! Every event is serialized as a single JSON line and flushed before the
//! write returns — the client sees progress live, never buffered. Writes
//! are serialized by an async mutex, so concurrent callers interleave at
//! record granularity, never mid-record.

use fl_core::{Clock, ErrorCode, Event, FlowError, SessionId};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

struct Inner {
    sink: Box<dyn AsyncWrite + Send + Unpin>,
    closed: bool,
}

/// Writes typed events to one client sink.
pub struct EventStreamWriter<C: Clock> {
    session_id: SessionId,
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> EventStreamWriter<C> {
    pub fn new(session_id: SessionId, sink: Box<dyn AsyncWrite + Send + Unpin>, clock: C) -> Self {
        Self {
            session_id,
            clock,
            inner: Mutex::new(Inner { sink, closed: false }),
        }
    }

    /// Writer over a discarding sink, for the blocking execution path.
    pub fn discarding(session_id: SessionId, clock: C) -> Self {
        Self::new(session_id, Box::new(tokio::io::sink()), clock)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Serialize, write, and flush one event. Fills `session_id` and
    /// `timestamp` when the caller left them empty.
    pub async fn write(&self, mut event: Event) -> Result<(), FlowError> {
        if event.session_id.is_empty() {
            event.session_id = self.session_id;
        }
        if event.timestamp == 0 {
            event.timestamp = self.clock.epoch_ms();
        }

        let mut line = serde_json::to_string(&event)
            .map_err(|e| FlowError::Internal(format!("event serialization: {e}")))?;
        // One logical record per line. serde_json escapes embedded newlines
        // inside strings; this guards payloads assembled from raw fragments.
        if line.contains('\n') {
            line = line.replace('\n', " ");
        }

        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(FlowError::SessionClosed(self.session_id));
        }
        let result = async {
            inner.sink.write_all(line.as_bytes()).await?;
            inner.sink.write_all(b"\n").await?;
            inner.sink.flush().await
        }
        .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                // A broken sink means the client is gone; further writes
                // are refused the same way as after close().
                tracing::debug!(session_id = %self.session_id, error = %e, "event sink broken");
                inner.closed = true;
                Err(FlowError::SessionClosed(self.session_id))
            }
        }
    }

    /// Liveness filler carrying the current Unix second.
    pub async fn write_heartbeat(&self) -> Result<(), FlowError> {
        self.write(Event::heartbeat(self.clock.epoch_secs())).await
    }

    pub async fn write_error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Result<(), FlowError> {
        self.write(Event::error(code, message, details)).await
    }

    /// Idempotent. Later writes return `SESSION_CLOSED`.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.closed {
            inner.closed = true;
            let _ = inner.sink.shutdown().await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
