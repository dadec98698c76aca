// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step execution records and session counters.

use serde::{Deserialize, Serialize};

/// Immutable record of one executed step. Appended to the session's result
/// list on the step's single terminal notification and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    pub step_id: String,
    pub step_name: String,
    pub step_type: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Empty on success.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Monotonic step counters for a session.
///
/// `total == success + failed` at every point; skipped steps don't count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
    pub total_steps: u64,
    pub success_steps: u64,
    pub failed_steps: u64,
}

impl StepCounters {
    /// Record one terminal step notification.
    pub fn record(&mut self, success: bool) {
        self.total_steps += 1;
        if success {
            self.success_steps += 1;
        } else {
            self.failed_steps += 1;
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
