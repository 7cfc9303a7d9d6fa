//! Bridge configuration.
//!
//! Loaded from a camelCase JSON object; every field is optional and falls
//! back to [`BridgeConfig::default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Type tag carried by text capture mode and overlay descriptions.
pub const TEXT_CAPTURE_TAG: &str = "textCapture";

const MIN_RESULT_TIMEOUT_MS: u64 = 1;
const MAX_RESULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct BridgeConfig {
    /// How long the engine thread waits for the host decision. Default: 2000.
    pub result_timeout_ms: u64,
    /// Decision applied when no host consumer answers (timeout or nobody
    /// listening). Default: `true`, capture keeps running.
    pub default_decision: bool,
    /// Enabled state given to freshly deserialized modes whose description
    /// has no `enabled` key. Default: `true`.
    pub default_mode_enabled: bool,
    /// `type` value that marks a description as ours.
    pub domain_tag: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            result_timeout_ms: 2_000,
            default_decision: true,
            default_mode_enabled: true,
            domain_tag: TEXT_CAPTURE_TAG.into(),
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON config object and normalize it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.normalize();
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.result_timeout_ms = self
            .result_timeout_ms
            .clamp(MIN_RESULT_TIMEOUT_MS, MAX_RESULT_TIMEOUT_MS);
        let tag = self.domain_tag.trim();
        self.domain_tag = if tag.is_empty() {
            TEXT_CAPTURE_TAG.into()
        } else {
            tag.to_string()
        };
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}
