// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for client socket I/O.
//!
//! Accepts connections on a Unix socket (plus optional TCP for remote
//! clients) and handles each on its own task. A streaming execute hands
//! the connection's write half to the session's event writer; everything
//! else is a one-line request, one-line response exchange.

use crate::orchestrator::Orchestrator;
use crate::protocol::{read_request, write_response, Request, Response};
use fl_core::{Clock, SessionId};
use fl_engine::InteractionReply;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Notify;

/// Shared daemon context for all connection handlers.
pub struct ListenCtx<C: Clock> {
    pub orchestrator: Arc<Orchestrator<C>>,
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting client connections.
pub struct Listener<C: Clock> {
    unix: UnixListener,
    tcp: Option<TcpListener>,
    ctx: Arc<ListenCtx<C>>,
}

impl<C: Clock> Listener<C> {
    /// Unix socket only.
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { unix, tcp: None, ctx }
    }

    /// Unix socket plus TCP.
    pub fn with_tcp(unix: UnixListener, tcp: TcpListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { unix, tcp: Some(tcp), ctx }
    }

    /// Accept until shutdown, spawning a task per connection.
    pub async fn run(self) {
        match self.tcp {
            Some(tcp) => Self::run_dual(self.unix, tcp, self.ctx).await,
            None => Self::run_unix_only(self.unix, self.ctx).await,
        }
    }

    async fn run_unix_only(unix: UnixListener, ctx: Arc<ListenCtx<C>>) {
        loop {
            tokio::select! {
                accepted = unix.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(handle_conn(stream, ctx));
                    }
                    Err(e) => tracing::warn!(error = %e, "unix accept failed"),
                },
                _ = ctx.shutdown.notified() => {
                    tracing::info!("listener shutting down");
                    break;
                }
            }
        }
    }

    async fn run_dual(unix: UnixListener, tcp: TcpListener, ctx: Arc<ListenCtx<C>>) {
        loop {
            tokio::select! {
                accepted = unix.accept() => match accepted {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(handle_conn(stream, ctx));
                    }
                    Err(e) => tracing::warn!(error = %e, "unix accept failed"),
                },
                accepted = tcp.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "tcp client connected");
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(handle_conn(stream, ctx));
                    }
                    Err(e) => tracing::warn!(error = %e, "tcp accept failed"),
                },
                _ = ctx.shutdown.notified() => {
                    tracing::info!("listener shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle one client connection: a single request, then either a unary
/// response or the event stream.
pub async fn handle_conn<S, C>(stream: S, ctx: Arc<ListenCtx<C>>)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    C: Clock,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let request = match read_request(&mut reader).await {
        Ok(request) => request,
        Err(e) => {
            let _ = write_response(&mut write_half, &Response::from_error(&e)).await;
            return;
        }
    };

    match request {
        Request::Ping => {
            let _ = write_response(&mut write_half, &Response::Pong).await;
        }
        Request::Execute { request, workflow } => {
            // The write half becomes the session's stream; the
            // orchestrator closes it on every exit path.
            let _ = ctx
                .orchestrator
                .execute_stream(request, workflow, Box::new(write_half))
                .await;
        }
        Request::SubmitInteraction { session_id, step_id, value, skipped } => {
            let reply = InteractionReply { value, skipped };
            let response = match ctx.orchestrator.submit_interaction(
                &SessionId::from_string(&session_id),
                &step_id,
                reply,
            ) {
                Ok(()) => Response::Ok,
                Err(e) => Response::from_error(&e),
            };
            let _ = write_response(&mut write_half, &response).await;
        }
        Request::Stop { session_id } => {
            let response = match ctx.orchestrator.stop(&SessionId::from_string(&session_id)) {
                Ok(()) => Response::Ok,
                Err(e) => Response::from_error(&e),
            };
            let _ = write_response(&mut write_half, &response).await;
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
