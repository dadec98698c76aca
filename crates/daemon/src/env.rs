// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use fl_core::FlowError;
use std::path::PathBuf;
use std::time::Duration;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Orchestrator tuning knobs, with the stock defaults. Built once at
/// startup and passed explicitly; no process-wide singletons.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on a whole run; requests may only shorten it.
    pub default_timeout: Duration,
    pub heartbeat_interval_local: Duration,
    pub heartbeat_interval_remote: Duration,
    /// Engine status poll cadence for local runs.
    pub poll_interval: Duration,
    /// Wait applied when an interaction carries no timeout of its own.
    pub interaction_default_timeout: Duration,
    /// Base URL slaves can use to call back into this orchestrator.
    pub callback_base_url: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30 * 60),
            heartbeat_interval_local: Duration::from_secs(15),
            heartbeat_interval_remote: Duration::from_secs(30),
            poll_interval: Duration::from_millis(200),
            interaction_default_timeout: Duration::from_secs(5 * 60),
            callback_base_url: None,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `FL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_timeout: env_ms("FL_DEFAULT_TIMEOUT_MS", defaults.default_timeout),
            heartbeat_interval_local: env_ms(
                "FL_HEARTBEAT_LOCAL_MS",
                defaults.heartbeat_interval_local,
            ),
            heartbeat_interval_remote: env_ms(
                "FL_HEARTBEAT_REMOTE_MS",
                defaults.heartbeat_interval_remote,
            ),
            poll_interval: env_ms("FL_POLL_INTERVAL_MS", defaults.poll_interval),
            interaction_default_timeout: env_ms(
                "FL_INTERACTION_TIMEOUT_MS",
                defaults.interaction_default_timeout,
            ),
            callback_base_url: std::env::var("FL_CALLBACK_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Total deadline for one request: the configured default, shortened by
    /// the request's own timeout when present.
    pub fn deadline(&self, request_timeout_secs: Option<u64>) -> Duration {
        match request_timeout_secs {
            Some(secs) if secs > 0 => self.default_timeout.min(Duration::from_secs(secs)),
            _ => self.default_timeout,
        }
    }
}

fn env_ms(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Resolve state directory: FL_STATE_DIR > XDG_STATE_HOME/flowline > ~/.local/state/flowline
pub fn state_dir() -> Result<PathBuf, FlowError> {
    if let Ok(dir) = std::env::var("FL_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("flowline"));
    }
    match dirs::home_dir() {
        Some(home) => Ok(home.join(".local/state/flowline")),
        None => Err(FlowError::Internal("cannot resolve state directory".into())),
    }
}

/// Unix socket path for the client listener.
pub fn socket_path() -> Result<PathBuf, FlowError> {
    if let Ok(path) = std::env::var("FL_SOCKET_PATH") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("fld.sock"))
}

/// TCP port for remote client connections. When set, the daemon listens on
/// this port in addition to the Unix socket.
pub fn tcp_port() -> Option<u16> {
    std::env::var("FL_TCP_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// TCP port the slave host binds in `--slave` mode.
pub fn slave_port() -> u16 {
    std::env::var("FL_SLAVE_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(7750)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
