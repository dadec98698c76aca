// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client protocol for the daemon socket.
//!
//! Wire format: newline-delimited JSON. The client sends one request line
//! per connection; unary calls answer with one response line, a streaming
//! execute answers with one event line per event until the stream closes.

use crate::orchestrator::ExecuteRequest;
use fl_core::{ErrorCode, FlowError, Workflow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Request from a client to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Start a streaming execution; the connection becomes the stream
    Execute {
        request: ExecuteRequest,
        workflow: Workflow,
    },

    /// Answer a session waiting on an interaction
    SubmitInteraction {
        session_id: String,
        step_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default)]
        skipped: bool,
    },

    /// Stop a running session
    Stop { session_id: String },
}

/// Unary response to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Ok,
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn from_error(e: &FlowError) -> Self {
        Response::Error { code: e.code(), message: e.to_string() }
    }
}

/// Read one request line from a buffered stream.
pub async fn read_request<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
) -> Result<Request, FlowError> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .await
        .map_err(|e| FlowError::InvalidInput(format!("read request: {e}")))?;
    if n == 0 {
        return Err(FlowError::InvalidInput("connection closed before request".into()));
    }
    serde_json::from_str(line.trim_end())
        .map_err(|e| FlowError::InvalidInput(format!("malformed request: {e}")))
}

/// Write one response line and flush.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), FlowError> {
    let mut line = serde_json::to_string(response)
        .map_err(|e| FlowError::Internal(format!("response encode: {e}")))?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| FlowError::Internal(format!("response write: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| FlowError::Internal(format!("response flush: {e}")))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
