//! Capability traits for the objects owned by the recognition engine.
//!
//! The engine itself (mode construction, frame processing, rendering) lives
//! outside this crate. Everything the bridge touches is reached through
//! these small traits so hosts can plug in the real engine types and tests
//! can plug in fakes.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Engine callback capability: one method, invoked on the engine's
/// processing thread each time a capture decision point is reached.
pub trait TextCaptureListener: Send + Sync {
    fn on_capture(
        &self,
        mode: &dyn TextCaptureMode,
        session: &dyn TextCaptureSession,
        frame: Arc<dyn FrameData>,
    );
}

/// A configured text capture behaviour running inside a context.
pub trait TextCaptureMode: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn add_listener(&self, listener: Arc<dyn TextCaptureListener>);

    /// Remove a previously added listener. Identity is pointer identity
    /// (see [`same_instance`]).
    fn remove_listener(&self, listener: &Arc<dyn TextCaptureListener>);

    fn apply_settings(&self, settings: &TextCaptureSettings);
}

/// Per-callback recognition session. Only its serialized form crosses
/// into the host.
pub trait TextCaptureSession: Send + Sync {
    fn to_json(&self) -> String;
}

/// Opaque frame handle. Hosts downcast through [`FrameData::as_any`].
pub trait FrameData: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Visual companion of a mode. Behaviour is entirely engine-side.
pub trait TextCaptureOverlay: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// The environment that owns and runs modes against incoming frames.
pub trait DataCaptureContext: Send + Sync {
    fn add_mode(&self, mode: Arc<dyn TextCaptureMode>);

    fn remove_mode(&self, mode: &Arc<dyn TextCaptureMode>);
}

/// Presentation surface overlays attach to. Only ever mutated from the
/// view-owning thread.
pub trait DataCaptureView: Send + Sync {
    fn add_overlay(&self, overlay: Arc<dyn TextCaptureOverlay>);

    fn remove_overlay(&self, overlay: &Arc<dyn TextCaptureOverlay>);
}

/// Recognition settings applied to a running mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct TextCaptureSettings {
    /// e.g. `"leftToRight"`, `"topToBottom"`.
    pub recognition_direction: Option<String>,
    /// Window in which identical results are suppressed.
    pub duplicate_filter_ms: Option<u64>,
    /// Engine-specific keys passed through untouched.
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Pointer identity for trait objects. Compares data pointers only, never
/// vtables, which may be duplicated across codegen units.
pub fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
