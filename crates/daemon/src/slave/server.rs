// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The slave host: a TCP listener serving the streaming execute channel
//! and the unary endpoints (ping, interaction, stop, blocking execute).
//!
//! Streaming runs reuse the local execution pipeline verbatim: the
//! session's event writer feeds an in-process duplex whose lines are
//! pumped onto the WebSocket one text frame per event, preserving order.

use super::http::{self, HttpRequest};
use super::{InteractionPost, PingReply, SlaveExecuteRequest, SlaveState};
use crate::orchestrator::{ExecuteRequest, ExecutorType, Orchestrator};
use crate::stream::EventStreamWriter;
use fl_core::{Clock, SessionId};
use fl_engine::InteractionReply;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Slave-side host around a local-only orchestrator.
pub struct SlaveServer<C: Clock> {
    orchestrator: Arc<Orchestrator<C>>,
    shutdown: Arc<Notify>,
    clock: C,
}

impl<C: Clock> SlaveServer<C> {
    pub fn new(orchestrator: Arc<Orchestrator<C>>, shutdown: Arc<Notify>, clock: C) -> Self {
        Self { orchestrator, shutdown, clock }
    }

    /// Accept until shutdown, one task per connection.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "slave connection accepted");
                        let server = Arc::clone(&self);
                        tokio::spawn(async move { server.handle_conn(stream).await });
                    }
                    Err(e) => tracing::warn!(error = %e, "slave accept failed"),
                },
                _ = self.shutdown.notified() => {
                    tracing::info!("slave host shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_conn(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream);
        let request = match http::read_http_request(&mut reader).await {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable slave request");
                return;
            }
        };

        if request.websocket_upgrade {
            // The peer sends nothing past the handshake until we answer
            // 101, so the buffered reader is empty when unwrapped here.
            let stream = reader.into_inner();
            self.handle_upgrade(request, stream).await;
        } else {
            let mut stream = reader.into_inner();
            self.handle_unary(request, &mut stream).await;
        }
    }

    async fn handle_upgrade(&self, request: HttpRequest, mut stream: TcpStream) {
        if request.path != "/api/v1/execute/stream" {
            let _ = http::write_http_response(&mut stream, 404, "{}").await;
            return;
        }
        let Some(key) = request.websocket_key else {
            let _ = http::write_http_response(&mut stream, 400, "{}").await;
            return;
        };
        let accept = derive_accept_key(key.as_bytes());
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
        );
        if stream.write_all(response.as_bytes()).await.is_err() {
            return;
        }
        let ws = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
        self.handle_stream_execute(ws).await;
    }

    /// One streaming execute: first frame is the request, then events flow
    /// out until the run finishes and the stream closes.
    async fn handle_stream_execute(&self, ws: WebSocketStream<TcpStream>) {
        let (mut ws_tx, mut ws_rx) = ws.split();

        let request: SlaveExecuteRequest = loop {
            match ws_rx.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(text.as_str()) {
                    Ok(request) => break request,
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed execute frame");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return;
                    }
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                _ => return,
            }
        };

        let session_id = SessionId::from_string(&request.session_id);
        tracing::info!(session_id = %session_id, workflow_id = %request.workflow.id, "slave stream execute");

        // Bridge: writer → duplex → one WS text frame per line.
        let (near, far) = tokio::io::duplex(64 * 1024);
        let writer = Arc::new(EventStreamWriter::new(
            session_id,
            Box::new(near),
            self.clock.clone(),
        ));
        let pump = tokio::spawn(async move {
            let mut lines = BufReader::new(far).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if ws_tx.send(Message::Text(line.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_tx.send(Message::Close(None)).await;
        });
        // Drain control frames so the socket stays healthy.
        let drain = tokio::spawn(async move { while let Some(Ok(_)) = ws_rx.next().await {} });

        let execute = ExecuteRequest {
            workflow_id: request.workflow.id.clone(),
            env_id: None,
            variables: request.variables,
            timeout_secs: request.timeout_secs,
            executor_type: ExecutorType::Local,
            slave_id: None,
        };
        let result = self
            .orchestrator
            .execute_with_writer(execute, request.workflow, writer)
            .await;
        if let Err(e) = result {
            tracing::warn!(session_id = %session_id, error = %e, "slave execution rejected");
        }

        // Writer close in finalize ends the duplex; wait for the tail to
        // reach the wire.
        let _ = pump.await;
        drain.abort();
    }

    async fn handle_unary(&self, request: HttpRequest, stream: &mut TcpStream) {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/api/v1/ping") => {
                let body = match serde_json::to_string(&PingReply { state: SlaveState::Online }) {
                    Ok(body) => body,
                    Err(_) => return,
                };
                let _ = http::write_http_response(stream, 200, &body).await;
            }
            ("POST", "/api/v1/interaction") => {
                let post: InteractionPost = match serde_json::from_str(&request.body) {
                    Ok(post) => post,
                    Err(e) => {
                        let _ = http::write_http_response(
                            stream,
                            400,
                            &format!(r#"{{"error":"{e}"}}"#),
                        )
                        .await;
                        return;
                    }
                };
                let reply = InteractionReply { value: post.value, skipped: post.skipped };
                match self.orchestrator.submit_interaction(
                    &SessionId::from_string(&post.session_id),
                    &post.step_id,
                    reply,
                ) {
                    Ok(()) => {
                        let _ = http::write_http_response(stream, 200, r#"{"ok":true}"#).await;
                    }
                    Err(e) => {
                        let body = format!(r#"{{"error":"{}"}}"#, e.code());
                        let _ = http::write_http_response(stream, 409, &body).await;
                    }
                }
            }
            ("POST", "/api/v1/stop") => {
                let session_id = serde_json::from_str::<serde_json::Value>(&request.body)
                    .ok()
                    .and_then(|v| v["session_id"].as_str().map(str::to_string));
                let Some(session_id) = session_id else {
                    let _ = http::write_http_response(stream, 400, "{}").await;
                    return;
                };
                match self.orchestrator.stop(&SessionId::from_string(&session_id)) {
                    Ok(()) => {
                        let _ = http::write_http_response(stream, 200, r#"{"ok":true}"#).await;
                    }
                    Err(e) => {
                        let body = format!(r#"{{"error":"{}"}}"#, e.code());
                        let _ = http::write_http_response(stream, 409, &body).await;
                    }
                }
            }
            ("POST", "/api/v1/execute") => {
                let request: SlaveExecuteRequest = match serde_json::from_str(&request.body) {
                    Ok(request) => request,
                    Err(e) => {
                        let _ = http::write_http_response(
                            stream,
                            400,
                            &format!(r#"{{"error":"{e}"}}"#),
                        )
                        .await;
                        return;
                    }
                };
                let writer = Arc::new(EventStreamWriter::discarding(
                    SessionId::from_string(&request.session_id),
                    self.clock.clone(),
                ));
                let execute = ExecuteRequest {
                    workflow_id: request.workflow.id.clone(),
                    env_id: None,
                    variables: request.variables,
                    timeout_secs: request.timeout_secs,
                    executor_type: ExecutorType::Local,
                    slave_id: None,
                };
                match self
                    .orchestrator
                    .execute_with_writer(execute, request.workflow, writer)
                    .await
                {
                    Ok(summary) => {
                        let body = match serde_json::to_string(&summary) {
                            Ok(body) => body,
                            Err(_) => return,
                        };
                        let _ = http::write_http_response(stream, 200, &body).await;
                    }
                    Err(e) => {
                        let body = format!(r#"{{"error":"{}"}}"#, e.code());
                        let _ = http::write_http_response(stream, 400, &body).await;
                    }
                }
            }
            _ => {
                let _ = http::write_http_response(stream, 404, "{}").await;
            }
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
