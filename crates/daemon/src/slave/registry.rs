// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slave directory: the known slave hosts and their advertised state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Advertised liveness of a slave. Anything other than `online` is treated
/// as unavailable for placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaveState {
    Online,
    Offline,
    Degraded,
}

/// One registered slave host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaveInfo {
    pub id: String,
    /// host:port of the slave's listener.
    pub address: String,
    pub state: SlaveState,
}

/// Registry of slaves, keyed by caller-chosen id.
#[derive(Default)]
pub struct SlaveDirectory {
    slaves: RwLock<HashMap<String, SlaveInfo>>,
}

impl SlaveDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, info: SlaveInfo) {
        tracing::info!(slave_id = %info.id, address = %info.address, "slave registered");
        self.slaves.write().insert(info.id.clone(), info);
    }

    pub fn get(&self, id: &str) -> Option<SlaveInfo> {
        self.slaves.read().get(id).cloned()
    }

    pub fn set_state(&self, id: &str, state: SlaveState) {
        if let Some(info) = self.slaves.write().get_mut(id) {
            info.state = state;
        }
    }

    pub fn remove(&self, id: &str) {
        self.slaves.write().remove(id);
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
