//! Deserializer seam.
//!
//! Building modes, settings and overlays from their JSON descriptions is the
//! engine's job. The bridge only calls through [`TextCaptureDeserializer`]
//! and listens to its progress through [`TextCaptureDeserializerDelegate`].

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Deserialize;

use crate::engine::{
    DataCaptureContext, TextCaptureMode, TextCaptureOverlay, TextCaptureSettings,
};
use crate::error::Result;

/// Builds and updates engine objects from serialized descriptions.
///
/// Implementors must call the installed delegate's
/// `did_finish_deserializing_mode` once a mode has been built by
/// [`TextCaptureDeserializer::mode_from_json`], before returning it.
pub trait TextCaptureDeserializer: Send + Sync {
    fn set_delegate(&self, delegate: Option<Weak<dyn TextCaptureDeserializerDelegate>>);

    fn mode_from_json(
        &self,
        mode_json: &str,
        context: &Arc<dyn DataCaptureContext>,
    ) -> Result<Arc<dyn TextCaptureMode>>;

    fn update_mode_from_json(
        &self,
        mode: &Arc<dyn TextCaptureMode>,
        mode_json: &str,
    ) -> Result<()>;

    fn settings_from_json(&self, settings_json: &str) -> Result<TextCaptureSettings>;

    fn overlay_from_json(
        &self,
        overlay_json: &str,
        mode: &Arc<dyn TextCaptureMode>,
    ) -> Result<Arc<dyn TextCaptureOverlay>>;

    fn update_overlay_from_json(
        &self,
        overlay: &Arc<dyn TextCaptureOverlay>,
        overlay_json: &str,
    ) -> Result<()>;
}

/// Progress hooks fired by a [`TextCaptureDeserializer`]. All no-ops by default.
pub trait TextCaptureDeserializerDelegate: Send + Sync {
    fn did_start_deserializing_mode(
        &self,
        _mode: &Arc<dyn TextCaptureMode>,
        _json: &serde_json::Value,
    ) {
    }

    fn did_finish_deserializing_mode(
        &self,
        _mode: &Arc<dyn TextCaptureMode>,
        _json: &serde_json::Value,
    ) {
    }

    fn did_start_deserializing_settings(
        &self,
        _settings: &TextCaptureSettings,
        _json: &serde_json::Value,
    ) {
    }

    fn did_finish_deserializing_settings(
        &self,
        _settings: &TextCaptureSettings,
        _json: &serde_json::Value,
    ) {
    }

    fn did_start_deserializing_overlay(
        &self,
        _overlay: &Arc<dyn TextCaptureOverlay>,
        _json: &serde_json::Value,
    ) {
    }

    fn did_finish_deserializing_overlay(
        &self,
        _overlay: &Arc<dyn TextCaptureOverlay>,
        _json: &serde_json::Value,
    ) {
    }
}

/// Delegate storage for deserializer implementations.
#[derive(Default)]
pub struct DelegateSlot {
    inner: RwLock<Option<Weak<dyn TextCaptureDeserializerDelegate>>>,
}

impl DelegateSlot {
    pub fn set(&self, delegate: Option<Weak<dyn TextCaptureDeserializerDelegate>>) {
        *self.inner.write() = delegate;
    }

    /// The installed delegate, if it is still alive.
    pub fn get(&self) -> Option<Arc<dyn TextCaptureDeserializerDelegate>> {
        self.inner.read().as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for DelegateSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateSlot")
            .field("installed", &self.get().is_some())
            .finish()
    }
}

/// The part of a description the bridge itself inspects.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DescriptionHeader {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `true` when `json` is an object whose `type` equals `tag`. Malformed
/// input is simply not ours.
pub(crate) fn has_type_tag(json: &str, tag: &str) -> bool {
    serde_json::from_str::<DescriptionHeader>(json)
        .ok()
        .and_then(|h| h.kind)
        .is_some_and(|kind| kind == tag)
}
