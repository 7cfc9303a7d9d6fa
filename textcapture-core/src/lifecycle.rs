//! Context/view lifecycle notifications.
//!
//! Observers attach to a [`LifecyclePublisher`] for as long as they are
//! started. [`LifecycleDispatcher`] is the in-process publisher: it holds
//! observers weakly and fans each notification out to every live one.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::{DataCaptureContext, DataCaptureView};
use crate::error::Result;

/// Lifecycle notifications. Every method defaults to a no-op so observers
/// only implement what concerns their domain.
pub trait DeserializationLifecycleObserver: Send + Sync {
    fn context_deserialized(&self, _context: Option<&Arc<dyn DataCaptureContext>>) {}

    fn context_disposed(&self) {}

    fn view_deserialized(&self, _view: Option<&Arc<dyn DataCaptureView>>) {}

    fn view_disposed(&self) {}

    fn add_mode(&self, _mode_json: &str) -> Result<()> {
        Ok(())
    }

    fn remove_mode(&self, _mode_json: &str) {}

    fn all_modes_removed(&self) {}

    fn add_overlay(&self, _overlay_json: &str) -> Result<()> {
        Ok(())
    }

    fn remove_overlay(&self, _overlay_json: &str) {}

    fn all_overlays_removed(&self) {}
}

/// Subscription capability of a lifecycle source.
pub trait LifecyclePublisher: Send + Sync {
    fn attach(&self, observer: Weak<dyn DeserializationLifecycleObserver>);

    fn detach(&self, observer: &Weak<dyn DeserializationLifecycleObserver>);
}

fn same_observer(
    a: &Weak<dyn DeserializationLifecycleObserver>,
    b: &Weak<dyn DeserializationLifecycleObserver>,
) -> bool {
    std::ptr::eq(a.as_ptr() as *const (), b.as_ptr() as *const ())
}

#[derive(Default)]
pub struct LifecycleDispatcher {
    observers: RwLock<Vec<Weak<dyn DeserializationLifecycleObserver>>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }

    /// Snapshot of live observers, taken so no lock is held while they run.
    fn live(&self) -> Vec<Arc<dyn DeserializationLifecycleObserver>> {
        self.observers.read().iter().filter_map(Weak::upgrade).collect()
    }

    pub fn dispatch_context_deserialized(&self, context: Option<&Arc<dyn DataCaptureContext>>) {
        for observer in self.live() {
            observer.context_deserialized(context);
        }
    }

    pub fn dispatch_context_disposed(&self) {
        for observer in self.live() {
            observer.context_disposed();
        }
    }

    pub fn dispatch_view_deserialized(&self, view: Option<&Arc<dyn DataCaptureView>>) {
        for observer in self.live() {
            observer.view_deserialized(view);
        }
    }

    pub fn dispatch_view_disposed(&self) {
        for observer in self.live() {
            observer.view_disposed();
        }
    }

    /// Stops at the first observer that fails to build the mode.
    pub fn dispatch_add_mode(&self, mode_json: &str) -> Result<()> {
        for observer in self.live() {
            observer.add_mode(mode_json)?;
        }
        Ok(())
    }

    pub fn dispatch_remove_mode(&self, mode_json: &str) {
        for observer in self.live() {
            observer.remove_mode(mode_json);
        }
    }

    pub fn dispatch_all_modes_removed(&self) {
        for observer in self.live() {
            observer.all_modes_removed();
        }
    }

    /// Stops at the first observer that fails to build the overlay.
    pub fn dispatch_add_overlay(&self, overlay_json: &str) -> Result<()> {
        for observer in self.live() {
            observer.add_overlay(overlay_json)?;
        }
        Ok(())
    }

    pub fn dispatch_remove_overlay(&self, overlay_json: &str) {
        for observer in self.live() {
            observer.remove_overlay(overlay_json);
        }
    }

    pub fn dispatch_all_overlays_removed(&self) {
        for observer in self.live() {
            observer.all_overlays_removed();
        }
    }
}

impl LifecyclePublisher for LifecycleDispatcher {
    fn attach(&self, observer: Weak<dyn DeserializationLifecycleObserver>) {
        let mut observers = self.observers.write();
        observers.retain(|o| o.strong_count() > 0);
        if observers.iter().any(|o| same_observer(o, &observer)) {
            debug!("lifecycle observer already attached");
            return;
        }
        observers.push(observer);
    }

    fn detach(&self, observer: &Weak<dyn DeserializationLifecycleObserver>) {
        self.observers
            .write()
            .retain(|o| o.strong_count() > 0 && !same_observer(o, observer));
    }
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("observers", &self.observer_count())
            .finish()
    }
}
