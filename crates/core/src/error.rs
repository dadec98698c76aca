// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error vocabulary for the orchestrator.
//!
//! Every failure that crosses a component boundary carries one of the
//! [`ErrorCode`] values below. Codes travel on the wire inside `error`
//! events; [`FlowError`] is the in-process carrier that maps onto them.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-level error codes. The set is closed; unknown codes are a protocol
/// violation, not an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConversionError,
    ExecutorError,
    SlaveConnectionError,
    SlaveUnavailable,
    AiError,
    AiTimeout,
    InteractionTimeout,
    SessionConflict,
    SessionNotFound,
    SessionClosed,
    Timeout,
    Cancelled,
    InternalError,
    InvalidInput,
}

impl ErrorCode {
    /// Whether a client may retry after seeing this code.
    ///
    /// Slave, AI, interaction, and session-conflict failures are transient;
    /// everything else terminates the attempt.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::SlaveConnectionError
                | ErrorCode::SlaveUnavailable
                | ErrorCode::AiError
                | ErrorCode::AiTimeout
                | ErrorCode::InteractionTimeout
                | ErrorCode::SessionConflict
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConversionError => "CONVERSION_ERROR",
            ErrorCode::ExecutorError => "EXECUTOR_ERROR",
            ErrorCode::SlaveConnectionError => "SLAVE_CONNECTION_ERROR",
            ErrorCode::SlaveUnavailable => "SLAVE_UNAVAILABLE",
            ErrorCode::AiError => "AI_ERROR",
            ErrorCode::AiTimeout => "AI_TIMEOUT",
            ErrorCode::InteractionTimeout => "INTERACTION_TIMEOUT",
            ErrorCode::SessionConflict => "SESSION_CONFLICT",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionClosed => "SESSION_CLOSED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the orchestrator fabric.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FlowError {
    #[error("workflow conversion failed: {0}")]
    Conversion(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("slave connection failed: {0}")]
    SlaveConnection(String),

    #[error("slave unavailable: {0}")]
    SlaveUnavailable(String),

    #[error("ai step failed: {0}")]
    Ai(String),

    #[error("ai step timed out: {0}")]
    AiTimeout(String),

    #[error("interaction timed out after {0}s")]
    InteractionTimeout(u64),

    #[error("session already exists: {0}")]
    SessionConflict(SessionId),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("session closed: {0}")]
    SessionClosed(SessionId),

    #[error("deadline exceeded")]
    Timeout,

    #[error("execution cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl FlowError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FlowError::Conversion(_) => ErrorCode::ConversionError,
            FlowError::Executor(_) => ErrorCode::ExecutorError,
            FlowError::SlaveConnection(_) => ErrorCode::SlaveConnectionError,
            FlowError::SlaveUnavailable(_) => ErrorCode::SlaveUnavailable,
            FlowError::Ai(_) => ErrorCode::AiError,
            FlowError::AiTimeout(_) => ErrorCode::AiTimeout,
            FlowError::InteractionTimeout(_) => ErrorCode::InteractionTimeout,
            FlowError::SessionConflict(_) => ErrorCode::SessionConflict,
            FlowError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            FlowError::SessionClosed(_) => ErrorCode::SessionClosed,
            FlowError::Timeout => ErrorCode::Timeout,
            FlowError::Cancelled => ErrorCode::Cancelled,
            FlowError::Internal(_) => ErrorCode::InternalError,
            FlowError::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }

    pub fn recoverable(&self) -> bool {
        self.code().recoverable()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
