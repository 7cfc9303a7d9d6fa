//! Host-facing event plumbing.
//!
//! The bridge never talks to the host directly: it publishes named events
//! through an [`Emitter`] and asks it whether anyone is listening. The
//! default implementation, [`BroadcastEmitter`], fans each event name out
//! over its own `tokio::sync::broadcast` channel.

pub mod events;

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast channel capacity per event name.
const BROADCAST_CAP: usize = 64;

/// One published event as seen by host consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Publishes named events to host-side consumers.
pub trait Emitter: Send + Sync {
    fn emit(&self, name: &str, payload: serde_json::Value);

    fn has_listener(&self, name: &str) -> bool;
}

/// [`Emitter`] backed by one broadcast channel per event name.
///
/// An event counts as listened to while at least one receiver returned by
/// [`BroadcastEmitter::subscribe`] is alive.
#[derive(Default)]
pub struct BroadcastEmitter {
    channels: RwLock<HashMap<String, broadcast::Sender<HostEvent>>>,
}

impl BroadcastEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to live events published under `name`.
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<HostEvent> {
        if let Some(tx) = self.channels.read().get(name) {
            return tx.subscribe();
        }
        self.channels
            .write()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAP).0)
            .subscribe()
    }
}

impl Emitter for BroadcastEmitter {
    fn emit(&self, name: &str, payload: serde_json::Value) {
        let channels = self.channels.read();
        let Some(tx) = channels.get(name) else {
            trace!(event = name, "no channel for event; dropped");
            return;
        };
        let _ = tx.send(HostEvent {
            name: name.to_string(),
            payload,
        });
    }

    fn has_listener(&self, name: &str) -> bool {
        self.channels
            .read()
            .get(name)
            .is_some_and(|tx| tx.receiver_count() > 0)
    }
}

impl std::fmt::Debug for BroadcastEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEmitter").finish_non_exhaustive()
    }
}
