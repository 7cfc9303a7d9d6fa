//! Event catalogue for the text capture bridge.
//!
//! | Event | Name | Payload | Result |
//! |-------|------|---------|--------|
//! | `DidCaptureText` | `"TextCaptureListener.didCaptureText"` | [`DidCaptureTextPayload`] | `bool` |

use serde::{Deserialize, Serialize};

/// Named events the bridge publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCaptureEvent {
    #[serde(rename = "TextCaptureListener.didCaptureText")]
    DidCaptureText,
}

impl TextCaptureEvent {
    pub const ALL: [TextCaptureEvent; 1] = [TextCaptureEvent::DidCaptureText];

    pub fn name(self) -> &'static str {
        match self {
            TextCaptureEvent::DidCaptureText => "TextCaptureListener.didCaptureText",
        }
    }
}

impl std::fmt::Display for TextCaptureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sent with `TextCaptureListener.didCaptureText`. The host answers with a
/// boolean: whether the mode should stay enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCaptureTextPayload {
    /// JSON-serialized capture session.
    pub session: String,
}
