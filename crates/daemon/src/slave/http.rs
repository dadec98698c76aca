// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 over TCP for the slave's unary endpoints.
//!
//! Client side sends one request and reads the response using
//! Content-Length framing (does not depend on connection close for EOF).
//! Server side parses just enough of a request for routing: method, path,
//! body, and the WebSocket upgrade headers.

use fl_core::FlowError;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub async fn get(addr: &str, path: &str) -> Result<String, FlowError> {
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\n\r\n", path, addr);
    timed_request(addr, &request).await
}

pub async fn post(addr: &str, path: &str, body: &str) -> Result<String, FlowError> {
    let request = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        addr,
        body.len(),
        body
    );
    timed_request(addr, &request).await
}

/// Connect, send, and read with a 5-second timeout covering the entire
/// operation. Prevents hangs when a slave accepts the connection but never
/// answers.
async fn timed_request(addr: &str, request: &str) -> Result<String, FlowError> {
    tokio::time::timeout(Duration::from_secs(5), send_request(addr, request))
        .await
        .map_err(|_| FlowError::SlaveConnection(format!("{addr}: request timed out")))?
}

async fn send_request(addr: &str, request: &str) -> Result<String, FlowError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| FlowError::SlaveConnection(format!("{addr}: connect failed: {e}")))?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| FlowError::SlaveConnection(format!("{addr}: write failed: {e}")))?;

    let mut reader = BufReader::new(&mut stream);
    read_http_response(&mut reader).await
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
async fn read_http_response<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<String, FlowError> {
    // Status line
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .await
        .map_err(|e| FlowError::SlaveConnection(format!("read status failed: {e}")))?;
    let status_code =
        status_line.split_whitespace().nth(1).and_then(|s| s.parse::<u16>().ok()).unwrap_or(0);

    // Headers, extract Content-Length (case-insensitive)
    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| FlowError::SlaveConnection(format!("read header failed: {e}")))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let line_lower = line.to_ascii_lowercase();
        if let Some(val) = line_lower.strip_prefix("content-length:") {
            content_length = val.trim().parse().unwrap_or(0);
        }
    }

    // Body
    let body = if content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader
            .read_exact(&mut buf)
            .await
            .map_err(|e| FlowError::SlaveConnection(format!("read body failed: {e}")))?;
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    };

    if status_code >= 400 {
        return Err(FlowError::SlaveConnection(format!(
            "HTTP {}: {}",
            status_code,
            body.trim()
        )));
    }
    Ok(body)
}

/// A parsed inbound request, just enough for the slave's routing.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: String,
    /// `Connection: upgrade` + `Upgrade: websocket` present.
    pub websocket_upgrade: bool,
    pub websocket_key: Option<String>,
}

/// Parse one request head (and body, for non-upgrade requests) from an
/// inbound connection.
pub async fn read_http_request<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<HttpRequest, FlowError> {
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(|e| FlowError::InvalidInput(format!("read request failed: {e}")))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    if method.is_empty() || path.is_empty() {
        return Err(FlowError::InvalidInput("malformed request line".into()));
    }

    let mut content_length: usize = 0;
    let mut upgrade_websocket = false;
    let mut connection_upgrade = false;
    let mut websocket_key = None;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| FlowError::InvalidInput(format!("read header failed: {e}")))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(val) = lower.strip_prefix("content-length:") {
            content_length = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = lower.strip_prefix("upgrade:") {
            upgrade_websocket = val.trim() == "websocket";
        } else if let Some(val) = lower.strip_prefix("connection:") {
            connection_upgrade = val.split(',').any(|t| t.trim() == "upgrade");
        } else if lower.starts_with("sec-websocket-key:") {
            // Preserve the original case of the key value
            websocket_key = line
                .splitn(2, ':')
                .nth(1)
                .map(|v| v.trim().to_string());
        }
    }

    let websocket = upgrade_websocket && connection_upgrade;
    let body = if !websocket && content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader
            .read_exact(&mut buf)
            .await
            .map_err(|e| FlowError::InvalidInput(format!("read body failed: {e}")))?;
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    };

    Ok(HttpRequest {
        method,
        path,
        body,
        websocket_upgrade: websocket,
        websocket_key,
    })
}

/// Write a plain JSON response.
pub async fn write_http_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    body: &str,
) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
