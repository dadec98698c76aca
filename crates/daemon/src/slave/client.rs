// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for one slave host: unary HTTP calls plus the streaming
//! WebSocket execute channel.

use super::http;
use super::{InteractionPost, PingReply, SlaveExecuteRequest, SlaveState};
use crate::orchestrator::ExecutionSummary;
use fl_core::FlowError;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// The slave's streaming channel type.
pub type SlaveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stateless client; every call names the slave's address.
pub struct SlaveClient;

impl SlaveClient {
    /// Liveness probe. Transport failure is a connection error; the state
    /// itself is for the caller to judge.
    pub async fn ping(addr: &str) -> Result<SlaveState, FlowError> {
        let body = http::get(addr, "/api/v1/ping").await?;
        let reply: PingReply = serde_json::from_str(&body)
            .map_err(|e| FlowError::SlaveConnection(format!("{addr}: bad ping reply: {e}")))?;
        Ok(reply.state)
    }

    /// Post one interaction reply, keyed by session and step.
    pub async fn post_interaction(addr: &str, post: &InteractionPost) -> Result<(), FlowError> {
        let body = serde_json::to_string(post)
            .map_err(|e| FlowError::Internal(format!("interaction encode: {e}")))?;
        http::post(addr, "/api/v1/interaction", &body).await?;
        Ok(())
    }

    /// Best-effort stop for a session running on the slave.
    pub async fn post_stop(addr: &str, session_id: &str) -> Result<(), FlowError> {
        let body = serde_json::json!({ "session_id": session_id }).to_string();
        http::post(addr, "/api/v1/stop", &body).await?;
        Ok(())
    }

    /// Synchronous execute: returns the slave's summary once the run ends.
    pub async fn execute_blocking(
        addr: &str,
        request: &SlaveExecuteRequest,
    ) -> Result<ExecutionSummary, FlowError> {
        let body = serde_json::to_string(request)
            .map_err(|e| FlowError::Internal(format!("execute encode: {e}")))?;
        let reply = http::post(addr, "/api/v1/execute", &body).await?;
        serde_json::from_str(&reply)
            .map_err(|e| FlowError::SlaveConnection(format!("{addr}: bad summary: {e}")))
    }

    /// Open the streaming execute channel and send the request as the
    /// first text frame. Events then flow back until the slave closes.
    pub async fn open_stream(
        addr: &str,
        request: &SlaveExecuteRequest,
    ) -> Result<SlaveStream, FlowError> {
        let url = format!("ws://{addr}/api/v1/execute/stream");
        let (mut stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| FlowError::SlaveConnection(format!("{addr}: ws connect: {e}")))?;
        let body = serde_json::to_string(request)
            .map_err(|e| FlowError::Internal(format!("execute encode: {e}")))?;
        stream
            .send(Message::Text(body.into()))
            .await
            .map_err(|e| FlowError::SlaveConnection(format!("{addr}: ws send: {e}")))?;
        Ok(stream)
    }
}
