//! `FrameworksTextCaptureListener` — turns an engine callback into a
//! blocking round-trip to the host.
//!
//! ## Callback path (engine thread)
//!
//! ```text
//! on_capture(mode, session, frame)
//!     ├─ gate disabled or no host listener → return, mode untouched
//!     ├─ reserve request slot (busy → warn, return, mode untouched)
//!     ├─ FrameCache ← frame
//!     ├─ emit {session} and block until finish() or timeout
//!     ├─ FrameCache cleared of this frame, then the slot is released
//!     ├─ host listener gone before publishing → return, mode untouched
//!     └─ mode.set_enabled(decision)      (default decision on timeout)
//! ```
//!
//! Nothing on this path returns an error to the engine.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::engine::{FrameData, TextCaptureListener, TextCaptureMode, TextCaptureSession};
use crate::ipc::events::{DidCaptureTextPayload, TextCaptureEvent};
use crate::ipc::Emitter;
use crate::sync::{EventWithResult, FrameCache, GatingFlag};

pub struct FrameworksTextCaptureListener {
    emitter: Arc<dyn Emitter>,
    gate: GatingFlag,
    did_capture_text: EventWithResult<bool>,
    frames: Arc<FrameCache>,
}

impl FrameworksTextCaptureListener {
    /// Listener publishing through `emitter` and caching frames in the
    /// process-wide [`FrameCache::shared`]. Starts disabled.
    pub fn new(emitter: Arc<dyn Emitter>, config: &BridgeConfig) -> Self {
        Self::with_frame_cache(emitter, config, FrameCache::shared())
    }

    pub fn with_frame_cache(
        emitter: Arc<dyn Emitter>,
        config: &BridgeConfig,
        frames: Arc<FrameCache>,
    ) -> Self {
        Self {
            emitter,
            gate: GatingFlag::new(false),
            did_capture_text: EventWithResult::new(
                TextCaptureEvent::DidCaptureText.name(),
                config.default_decision,
                config.result_timeout(),
            ),
            frames,
        }
    }

    pub fn enable(&self) {
        self.gate.enable();
    }

    pub fn disable(&self) {
        self.gate.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Host answer to the pending `didCaptureText` event.
    pub fn finish_did_capture_text(&self, enabled: bool) {
        self.did_capture_text.finish(enabled);
    }

    pub fn frame_cache(&self) -> &Arc<FrameCache> {
        &self.frames
    }

    fn has_host_listener(&self) -> bool {
        self.emitter.has_listener(self.did_capture_text.name())
    }
}

impl TextCaptureListener for FrameworksTextCaptureListener {
    fn on_capture(
        &self,
        mode: &dyn TextCaptureMode,
        session: &dyn TextCaptureSession,
        frame: Arc<dyn FrameData>,
    ) {
        if !self.gate.is_enabled() || !self.has_host_listener() {
            return;
        }

        let request = match self.did_capture_text.reserve() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "capture callback dropped");
                return;
            }
        };

        let frame_scope = self.frames.scope(frame);
        let payload = DidCaptureTextPayload {
            session: session.to_json(),
        };
        let decision = request.emit(self.emitter.as_ref(), &payload);
        // The frame goes first so the next callback cannot have cached its own yet.
        drop(frame_scope);
        drop(request);

        let Some(enabled) = decision else {
            debug!("host listener left before publishing; mode untouched");
            return;
        };
        debug!(enabled, "applying host capture decision");
        mode.set_enabled(enabled);
    }
}

impl std::fmt::Debug for FrameworksTextCaptureListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameworksTextCaptureListener")
            .field("enabled", &self.gate.is_enabled())
            .field("event", &self.did_capture_text)
            .finish_non_exhaustive()
    }
}
