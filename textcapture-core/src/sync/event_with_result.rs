//! Blocking request/response handoff across threads.
//!
//! ```text
//! engine thread                         host thread
//! ─────────────                         ───────────
//! reserve() ──► slot = Some((gen, tx))
//! emit(payload) ──► Emitter ─────────►  consumer sees event
//!   recv_timeout(rx) … blocked …        finish(value) ──► slot.take() → tx.send
//!   ◄──────────────────────────────────────────────────────┘
//! drop(PendingRequest) ──► slot = None, only if it still holds `gen`
//! ```
//!
//! At most one request is outstanding. Reserving while the slot is taken
//! fails with `TextCaptureError::RequestPending` instead of clobbering the
//! first request's result delivery. Once `finish` has taken the sender a
//! new request may reserve, so every reservation carries a generation and
//! a request only ever releases its own.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, TextCaptureError};
use crate::ipc::Emitter;

struct Slot<T> {
    next_generation: u64,
    current: Option<(u64, Sender<T>)>,
}

pub struct EventWithResult<T> {
    name: String,
    default: T,
    timeout: Duration,
    slot: Mutex<Slot<T>>,
}

impl<T: Clone + Send> EventWithResult<T> {
    /// `default` is returned when nobody answers in `timeout`.
    pub fn new(name: impl Into<String>, default: T, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            default,
            timeout,
            slot: Mutex::new(Slot {
                next_generation: 0,
                current: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().current.is_some()
    }

    /// Claim the single request slot. The slot is released when the host
    /// finishes the request or when the returned request is dropped,
    /// whichever comes first.
    ///
    /// # Errors
    /// `TextCaptureError::RequestPending` if another request holds the slot.
    pub fn reserve(&self) -> Result<PendingRequest<'_, T>> {
        let mut slot = self.slot.lock();
        if slot.current.is_some() {
            return Err(TextCaptureError::RequestPending {
                event: self.name.clone(),
            });
        }
        let generation = slot.next_generation;
        slot.next_generation = generation.wrapping_add(1);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slot.current = Some((generation, tx));
        Ok(PendingRequest {
            owner: self,
            generation,
            rx,
        })
    }

    /// Reserve, publish and wait in one step. Without a consumer the
    /// default is returned immediately.
    pub fn emit<P: Serialize>(&self, emitter: &dyn Emitter, payload: &P) -> Result<T> {
        let request = self.reserve()?;
        Ok(request
            .emit(emitter, payload)
            .unwrap_or_else(|| self.default.clone()))
    }

    /// Resolve the outstanding request with `value`. No-op when nothing is pending.
    pub fn finish(&self, value: T) {
        let Some((generation, tx)) = self.slot.lock().current.take() else {
            debug!(event = %self.name, "finish without a pending request; ignored");
            return;
        };
        // The receiver is gone only if the waiter already gave up.
        if tx.try_send(value).is_err() {
            debug!(event = %self.name, generation, "result arrived after the waiter left");
        }
    }
}

impl<T> std::fmt::Debug for EventWithResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("EventWithResult")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("pending", &slot.current.as_ref().map(|(g, _)| *g))
            .finish()
    }
}

/// An in-flight request holding the slot of its [`EventWithResult`].
#[must_use = "dropping the request releases the slot without emitting"]
pub struct PendingRequest<'a, T> {
    owner: &'a EventWithResult<T>,
    generation: u64,
    rx: Receiver<T>,
}

impl<T: Clone + Send> PendingRequest<'_, T> {
    /// Publish `payload` and block until the host answers or the timeout
    /// elapses, in which case the default is returned.
    ///
    /// `None` means nobody was listening and nothing was published. The
    /// slot stays claimed until the request is dropped.
    pub fn emit<P: Serialize>(&self, emitter: &dyn Emitter, payload: &P) -> Option<T> {
        let owner = self.owner;
        if !emitter.has_listener(&owner.name) {
            return None;
        }

        let payload = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(event = %owner.name, error = %e, "payload serialization failed; using default");
                return Some(owner.default.clone());
            }
        };

        emitter.emit(&owner.name, payload);

        let value = match self.rx.recv_timeout(owner.timeout) {
            Ok(value) => value,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    event = %owner.name,
                    timeout_ms = u64::try_from(owner.timeout.as_millis()).unwrap_or(u64::MAX),
                    "no result before timeout; using default"
                );
                owner.default.clone()
            }
            Err(RecvTimeoutError::Disconnected) => owner.default.clone(),
        };
        Some(value)
    }
}

impl<T> Drop for PendingRequest<'_, T> {
    fn drop(&mut self) {
        let mut slot = self.owner.slot.lock();
        if matches!(slot.current, Some((generation, _)) if generation == self.generation) {
            slot.current = None;
        }
    }
}
