// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slave executor fabric: directory, wire types, client, driver, and the
//! slave-side host process.

pub mod client;
pub mod driver;
pub mod http;
pub mod registry;
pub mod server;

pub use client::SlaveClient;
pub use driver::execute_remote;
pub use registry::{SlaveDirectory, SlaveInfo, SlaveState};
pub use server::SlaveServer;

use fl_core::Workflow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Streaming execute request, sent as the first text frame on the slave's
/// WebSocket and as the body of the synchronous execute POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaveExecuteRequest {
    pub session_id: String,
    pub workflow: Workflow,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Where a callback-style slave may post interaction requests. The
    /// streaming slave emits `ai_interaction_required` instead and receives
    /// the reply on its own interaction endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_url: Option<String>,
}

/// Interaction reply posted to the slave, keyed by session and step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPost {
    pub session_id: String,
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub skipped: bool,
}

/// Liveness probe reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingReply {
    pub state: SlaveState,
}
