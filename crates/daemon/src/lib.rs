// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fl-daemon: the Flowline orchestrator fabric.
//!
//! Accepts workflow execution requests, allocates debug sessions, drives
//! the embedded engine locally or a remote slave host, streams ordered
//! per-step events back to the client, and brokers the human-in-the-loop
//! rendezvous that pauses execution mid-workflow.

pub mod callback;
pub mod env;
pub mod hub;
pub mod listener;
pub mod local;
pub mod master;
pub mod orchestrator;
pub mod protocol;
pub mod sessions;
pub mod slave;
pub mod stream;

#[cfg(test)]
mod test_helpers;

pub use callback::SessionCallback;
pub use env::OrchestratorConfig;
pub use hub::FanoutHub;
pub use listener::{ListenCtx, Listener};
pub use master::MasterExecutor;
pub use orchestrator::{ExecuteRequest, ExecutionSummary, ExecutorType, Orchestrator};
pub use protocol::{Request, Response};
pub use sessions::{InteractionWait, Session, SessionRegistry};
pub use slave::{SlaveDirectory, SlaveInfo, SlaveState};
pub use stream::EventStreamWriter;
