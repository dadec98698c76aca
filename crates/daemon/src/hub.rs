// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out hub for the bidirectional (master) mode.
//!
//! Many observers may attach to one session; messages are delivered
//! best-effort with `try_send`, and a connection that cannot take a
//! message is unregistered on the spot.

use fl_core::{Event, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Event>,
}

/// Broadcast registry keyed by session id.
#[derive(Default)]
pub struct FanoutHub {
    subscribers: Mutex<HashMap<SessionId, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection to a session; returns its handle for
    /// `unregister`.
    pub fn register(&self, session_id: SessionId, tx: mpsc::Sender<Event>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(session_id)
            .or_default()
            .push(Subscriber { id, tx });
        tracing::debug!(session_id = %session_id, conn = id, "observer attached");
        id
    }

    pub fn unregister(&self, session_id: &SessionId, conn: u64) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(session_id) {
            list.retain(|s| s.id != conn);
            if list.is_empty() {
                subscribers.remove(session_id);
            }
        }
    }

    /// Best-effort delivery to every observer of `session_id`. A full or
    /// closed connection is dropped from the session.
    pub fn broadcast(&self, session_id: &SessionId, event: &Event) {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(session_id) else {
            return;
        };
        list.retain(|s| match s.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(session_id = %session_id, conn = s.id, error = %e, "observer dropped");
                false
            }
        });
        if list.is_empty() {
            subscribers.remove(session_id);
        }
    }

    pub fn observer_count(&self, session_id: &SessionId) -> usize {
        self.subscribers
            .lock()
            .get(session_id)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
