//! Process-wide single slot holding the frame of the callback in flight.
//!
//! The slot is filled right before the host is notified and emptied as soon
//! as the callback returns. [`FrameScope`] empties it on drop so timeout,
//! error and unwinding paths all leave it clear. A scope only clears the
//! frame it stored, never one a later callback has put there since.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::engine::{same_instance, FrameData};

static SHARED: OnceLock<Arc<FrameCache>> = OnceLock::new();

#[derive(Default)]
pub struct FrameCache {
    slot: Mutex<Option<Arc<dyn FrameData>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used unless a listener is given its own.
    pub fn shared() -> Arc<FrameCache> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(FrameCache::new())))
    }

    /// Frame of the callback currently in flight, if any.
    pub fn current(&self) -> Option<Arc<dyn FrameData>> {
        self.slot.lock().clone()
    }

    pub fn set(&self, frame: Arc<dyn FrameData>) {
        *self.slot.lock() = Some(frame);
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }

    /// Clear the slot only if it still holds `frame`. Returns whether it did.
    pub fn clear_if(&self, frame: &Arc<dyn FrameData>) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|held| same_instance(held, frame)) {
            *slot = None;
            return true;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Store `frame`, overwriting any stale value, until the returned guard drops.
    pub fn scope(&self, frame: Arc<dyn FrameData>) -> FrameScope<'_> {
        self.set(Arc::clone(&frame));
        FrameScope { cache: self, frame }
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}

/// Clears its frame from the owning [`FrameCache`] when dropped.
#[must_use = "the frame is cleared as soon as the scope is dropped"]
pub struct FrameScope<'a> {
    cache: &'a FrameCache,
    frame: Arc<dyn FrameData>,
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        self.cache.clear_if(&self.frame);
    }
}
