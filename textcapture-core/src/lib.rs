//! # textcapture-core
//!
//! Bridge between a frame-processing recognition engine and an asynchronous
//! host application.
//!
//! ## Architecture
//!
//! ```text
//! engine thread                                      host thread
//! ─────────────                                      ───────────
//! mode ──on_capture──► FrameworksTextCaptureListener
//!                        gate? ─► FrameCache ← frame
//!                        EventWithResult::emit ──► Emitter ──► consumer
//!                        … blocked …                          │
//!                        ◄──────────── finish_did_capture_text(bool)
//!                        mode.set_enabled(decision)
//!
//! LifecycleDispatcher ──► TextCaptureModule ──► deserializer / context / view
//!                                           └─► ViewDispatcher (sync hop)
//! ```
//!
//! The engine-facing path never fails: timeouts and missing consumers
//! resolve to the configured default decision.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod deserializer;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod lifecycle;
pub mod listener;
pub mod module;
pub mod result;
pub mod sync;
pub mod view_thread;

// Convenience re-exports for downstream crates
pub use config::{BridgeConfig, TEXT_CAPTURE_TAG};
pub use deserializer::{DelegateSlot, TextCaptureDeserializer, TextCaptureDeserializerDelegate};
pub use engine::{
    DataCaptureContext, DataCaptureView, FrameData, TextCaptureListener, TextCaptureMode,
    TextCaptureOverlay, TextCaptureSession, TextCaptureSettings,
};
pub use error::TextCaptureError;
pub use ipc::events::{DidCaptureTextPayload, TextCaptureEvent};
pub use ipc::{BroadcastEmitter, Emitter, HostEvent};
pub use lifecycle::{DeserializationLifecycleObserver, LifecycleDispatcher, LifecyclePublisher};
pub use listener::FrameworksTextCaptureListener;
pub use module::TextCaptureModule;
pub use result::{FrameworksResult, ResultCell, ResultOutcome};
pub use sync::{EventWithResult, FrameCache, GatingFlag};
pub use view_thread::{InlineDispatcher, ViewDispatcher, ViewThread};
