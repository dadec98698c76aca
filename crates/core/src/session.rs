// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity and lifecycle status.
//!
//! A session is one orchestrator-scoped run of a workflow on behalf of one
//! client stream. Status only ever moves forward into a terminal state.

use crate::id::{IdKind, TypedId};
use serde::{Deserialize, Serialize};

/// Id family for debug sessions.
pub enum SessionKind {}

impl IdKind for SessionKind {
    const PREFIX: &'static str = "ses-";
}

/// Unique identifier for a debug session.
pub type SessionId = TypedId<SessionKind>;

/// Lifecycle status of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    WaitingInteraction,
    Completed,
    Failed,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Stopped
        )
    }

    /// Status string reported in the terminal `workflow_completed` event.
    pub fn wire_status(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "success",
            SessionStatus::Failed => "failed",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Running | SessionStatus::WaitingInteraction => "running",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Running => "running",
            SessionStatus::WaitingInteraction => "waiting_interaction",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
