use thiserror::Error;

/// All errors produced by textcapture-core.
#[derive(Debug, Error)]
pub enum TextCaptureError {
    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("a result for event {event:?} is already pending")]
    RequestPending { event: String },

    #[error("view thread is no longer running")]
    ViewThreadUnavailable,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TextCaptureError>;
