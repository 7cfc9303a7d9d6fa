//! `TextCaptureModule` — lifecycle controller for the text capture bridge.
//!
//! ## Tracked state
//!
//! ```text
//! context ─(weak)─┐        mode ◄── listener attached while tracked
//! view ───(weak)──┤──────► overlay (attached to view when both are known)
//! ```
//!
//! - Switching modes always detaches the listener from the outgoing mode
//!   before it is attached to the incoming one.
//! - Overlay attach/detach runs on the view thread through a synchronous
//!   [`ViewDispatcher`] hop and is complete before the notifying call returns.
//! - Descriptions whose `type` is not this module's domain tag are ignored.
//!
//! Lifecycle and update calls are expected to be serialized by the host.
//! The state lock is never held while engine objects are called.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::deserializer::{has_type_tag, TextCaptureDeserializer, TextCaptureDeserializerDelegate};
use crate::engine::{
    same_instance, DataCaptureContext, DataCaptureView, FrameData, TextCaptureListener,
    TextCaptureMode, TextCaptureOverlay,
};
use crate::error::{Result, TextCaptureError};
use crate::lifecycle::{DeserializationLifecycleObserver, LifecyclePublisher};
use crate::listener::FrameworksTextCaptureListener;
use crate::result::FrameworksResult;
use crate::view_thread::ViewDispatcher;

struct ModuleState {
    context: Option<Weak<dyn DataCaptureContext>>,
    view: Option<Weak<dyn DataCaptureView>>,
    mode: Option<Arc<dyn TextCaptureMode>>,
    overlay: Option<Arc<dyn TextCaptureOverlay>>,
    /// Enabled state for modes whose description has no `enabled` key.
    mode_enabled: bool,
}

impl ModuleState {
    fn context(&self) -> Option<Arc<dyn DataCaptureContext>> {
        self.context.as_ref().and_then(Weak::upgrade)
    }

    fn view(&self) -> Option<Arc<dyn DataCaptureView>> {
        self.view.as_ref().and_then(Weak::upgrade)
    }
}

pub struct TextCaptureModule {
    listener: Arc<FrameworksTextCaptureListener>,
    deserializer: Arc<dyn TextCaptureDeserializer>,
    publisher: Arc<dyn LifecyclePublisher>,
    view_dispatcher: Arc<dyn ViewDispatcher>,
    domain_tag: String,
    state: Mutex<ModuleState>,
}

impl TextCaptureModule {
    pub fn new(
        listener: Arc<FrameworksTextCaptureListener>,
        deserializer: Arc<dyn TextCaptureDeserializer>,
        publisher: Arc<dyn LifecyclePublisher>,
        view_dispatcher: Arc<dyn ViewDispatcher>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            listener,
            deserializer,
            publisher,
            view_dispatcher,
            domain_tag: config.domain_tag.clone(),
            state: Mutex::new(ModuleState {
                context: None,
                view: None,
                mode: None,
                overlay: None,
                mode_enabled: config.default_mode_enabled,
            }),
        }
    }

    // ── Start / stop ─────────────────────────────────────────────────────

    /// Become the deserializer's delegate and subscribe to lifecycle events.
    pub fn did_start(self: &Arc<Self>) {
        let delegate: Weak<dyn TextCaptureDeserializerDelegate> = Arc::downgrade(self) as _;
        self.deserializer.set_delegate(Some(delegate));
        self.publisher.attach(self.observer_handle());
        info!(domain = %self.domain_tag, "text capture module started");
    }

    pub fn did_stop(self: &Arc<Self>) {
        self.deserializer.set_delegate(None);
        self.publisher.detach(&self.observer_handle());
        self.listener.disable();
        info!(domain = %self.domain_tag, "text capture module stopped");
    }

    fn observer_handle(self: &Arc<Self>) -> Weak<dyn DeserializationLifecycleObserver> {
        Arc::downgrade(self) as _
    }

    // ── Host surface ─────────────────────────────────────────────────────

    pub fn add_listener(&self) {
        self.listener.enable();
    }

    pub fn remove_listener(&self) {
        self.listener.disable();
    }

    pub fn finish_did_capture_text(&self, enabled: bool) {
        self.listener.finish_did_capture_text(enabled);
    }

    /// Frame of the capture callback currently awaiting a host decision.
    pub fn last_frame(&self) -> Option<Arc<dyn FrameData>> {
        self.listener.frame_cache().current()
    }

    pub fn set_mode_enabled(&self, enabled: bool) {
        let mode = {
            let mut state = self.state.lock();
            state.mode_enabled = enabled;
            state.mode.clone()
        };
        if let Some(mode) = mode {
            mode.set_enabled(enabled);
        }
    }

    /// Live enabled state of the tracked mode; `false` without one.
    pub fn is_mode_enabled(&self) -> bool {
        self.current_mode().is_some_and(|m| m.is_enabled())
    }

    pub fn has_mode(&self) -> bool {
        self.state.lock().mode.is_some()
    }

    pub fn has_overlay(&self) -> bool {
        self.state.lock().overlay.is_some()
    }

    pub fn update_mode_from_json(&self, mode_json: &str, result: &dyn FrameworksResult) {
        let Some(mode) = self.current_mode() else {
            result.success(None);
            return;
        };
        report(result, self.deserializer.update_mode_from_json(&mode, mode_json));
    }

    pub fn apply_mode_settings(&self, settings_json: &str, result: &dyn FrameworksResult) {
        let Some(mode) = self.current_mode() else {
            result.success(None);
            return;
        };
        let applied = self
            .deserializer
            .settings_from_json(settings_json)
            .map(|settings| mode.apply_settings(&settings));
        report(result, applied);
    }

    pub fn update_overlay(&self, overlay_json: &str, result: &dyn FrameworksResult) {
        let Some(overlay) = self.state.lock().overlay.clone() else {
            result.success(None);
            return;
        };
        report(
            result,
            self.deserializer.update_overlay_from_json(&overlay, overlay_json),
        );
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn current_mode(&self) -> Option<Arc<dyn TextCaptureMode>> {
        self.state.lock().mode.clone()
    }

    fn is_ours(&self, json: &str) -> bool {
        has_type_tag(json, &self.domain_tag)
    }

    fn listener_handle(&self) -> Arc<dyn TextCaptureListener> {
        Arc::clone(&self.listener) as Arc<dyn TextCaptureListener>
    }

    /// Swap the tracked mode, moving the listener from the old one to the new one.
    fn replace_mode(&self, next: Option<Arc<dyn TextCaptureMode>>) {
        let previous = self.state.lock().mode.take();
        let listener = self.listener_handle();

        if let Some(old) = previous {
            old.remove_listener(&listener);
            info!("listener detached from outgoing mode");
        }
        if let Some(new) = &next {
            new.add_listener(listener);
            info!("listener attached to mode");
        }
        self.state.lock().mode = next;
    }

    /// Apply the initial enabled state and start tracking `mode`.
    fn adopt_mode(&self, mode: &Arc<dyn TextCaptureMode>, json: &serde_json::Value) {
        let enabled = match json.get("enabled").and_then(serde_json::Value::as_bool) {
            Some(enabled) => enabled,
            None => self.state.lock().mode_enabled,
        };
        mode.set_enabled(enabled);
        self.replace_mode(Some(Arc::clone(mode)));
    }

    fn is_tracked(&self, mode: &Arc<dyn TextCaptureMode>) -> bool {
        self.state
            .lock()
            .mode
            .as_ref()
            .is_some_and(|current| same_instance(current, mode))
    }

    /// Run `f` on the view thread and hand back its value.
    fn on_view_thread<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.view_dispatcher.dispatch_sync(Box::new(move || {
            let _ = tx.send(f());
        }))?;
        rx.try_recv()
            .map_err(|_| TextCaptureError::ViewThreadUnavailable)
    }

    /// Detach the tracked overlay from the known view and stop tracking it.
    fn release_overlay(&self) {
        let (overlay, view) = {
            let mut state = self.state.lock();
            (state.overlay.take(), state.view())
        };
        let Some(overlay) = overlay else {
            return;
        };
        if let Some(view) = view {
            if let Err(e) = self.on_view_thread(move || view.remove_overlay(&overlay)) {
                warn!(error = %e, "failed to detach overlay from view");
            }
        }
        info!("overlay released");
    }
}

fn report(result: &dyn FrameworksResult, outcome: Result<()>) {
    match outcome {
        Ok(()) => result.success(None),
        Err(e) => result.reject(e),
    }
}

impl TextCaptureDeserializerDelegate for TextCaptureModule {
    fn did_finish_deserializing_mode(
        &self,
        mode: &Arc<dyn TextCaptureMode>,
        json: &serde_json::Value,
    ) {
        self.adopt_mode(mode, json);
    }
}

impl DeserializationLifecycleObserver for TextCaptureModule {
    fn context_deserialized(&self, context: Option<&Arc<dyn DataCaptureContext>>) {
        self.state.lock().context = context.map(Arc::downgrade);
        debug!(bound = context.is_some(), "context binding updated");
    }

    fn context_disposed(&self) {
        self.release_overlay();
        let mut state = self.state.lock();
        state.context = None;
        state.view = None;
        debug!("context disposed; context and view references cleared");
    }

    fn view_deserialized(&self, view: Option<&Arc<dyn DataCaptureView>>) {
        let (overlay, had_view) = {
            let mut state = self.state.lock();
            let had_view = state.view().is_some();
            state.view = view.map(Arc::downgrade);
            (state.overlay.clone(), had_view)
        };
        let (Some(view), Some(overlay), false) = (view, overlay, had_view) else {
            return;
        };
        let view = Arc::clone(view);
        match self.on_view_thread(move || view.add_overlay(overlay)) {
            Ok(()) => info!("pending overlay attached to new view"),
            Err(e) => warn!(error = %e, "failed to attach overlay to new view"),
        }
    }

    fn view_disposed(&self) {
        self.release_overlay();
        self.state.lock().view = None;
    }

    fn add_mode(&self, mode_json: &str) -> Result<()> {
        if !self.is_ours(mode_json) {
            debug!("add-mode for another domain; ignored");
            return Ok(());
        }
        let Some(context) = self.state.lock().context() else {
            debug!("add-mode without a bound context; ignored");
            return Ok(());
        };

        let mode = self.deserializer.mode_from_json(mode_json, &context)?;
        if !self.is_tracked(&mode) {
            let json: serde_json::Value = serde_json::from_str(mode_json)?;
            self.adopt_mode(&mode, &json);
        }
        context.add_mode(mode);
        Ok(())
    }

    fn remove_mode(&self, mode_json: &str) {
        if !self.is_ours(mode_json) {
            return;
        }
        let (mode, context) = {
            let state = self.state.lock();
            (state.mode.clone(), state.context())
        };
        let Some(mode) = mode else {
            return;
        };
        if let Some(context) = context {
            context.remove_mode(&mode);
        }
        self.replace_mode(None);
    }

    fn all_modes_removed(&self) {
        self.replace_mode(None);
        self.release_overlay();
    }

    fn add_overlay(&self, overlay_json: &str) -> Result<()> {
        if !self.is_ours(overlay_json) {
            debug!("add-overlay for another domain; ignored");
            return Ok(());
        }
        let (mode, view, previous) = {
            let state = self.state.lock();
            (state.mode.clone(), state.view(), state.overlay.clone())
        };
        let Some(mode) = mode else {
            debug!("add-overlay without a tracked mode; ignored");
            return Ok(());
        };

        let deserializer = Arc::clone(&self.deserializer);
        let overlay_json = overlay_json.to_owned();
        let overlay = self.on_view_thread(move || -> Result<Arc<dyn TextCaptureOverlay>> {
            let overlay = deserializer.overlay_from_json(&overlay_json, &mode)?;
            if let Some(view) = &view {
                if let Some(previous) = &previous {
                    view.remove_overlay(previous);
                }
                view.add_overlay(Arc::clone(&overlay));
            }
            Ok(overlay)
        })??;

        self.state.lock().overlay = Some(overlay);
        info!("overlay created");
        Ok(())
    }

    fn remove_overlay(&self, overlay_json: &str) {
        if self.is_ours(overlay_json) {
            self.release_overlay();
        }
    }

    fn all_overlays_removed(&self) {
        self.release_overlay();
    }
}

impl std::fmt::Debug for TextCaptureModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TextCaptureModule")
            .field("domain_tag", &self.domain_tag)
            .field("has_context", &state.context().is_some())
            .field("has_view", &state.view().is_some())
            .field("has_mode", &state.mode.is_some())
            .field("has_overlay", &state.overlay.is_some())
            .field("mode_enabled", &state.mode_enabled)
            .finish_non_exhaustive()
    }
}
