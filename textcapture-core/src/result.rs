//! Result sink for host calls that complete with success or rejection.

use parking_lot::Mutex;

use crate::error::TextCaptureError;

/// Reports the outcome of one host call.
pub trait FrameworksResult: Send + Sync {
    fn success(&self, result: Option<serde_json::Value>);

    fn reject(&self, error: TextCaptureError);
}

#[derive(Debug)]
pub enum ResultOutcome {
    Success(Option<serde_json::Value>),
    Rejected(TextCaptureError),
}

impl ResultOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultOutcome::Success(_))
    }
}

/// [`FrameworksResult`] that stores the first outcome for later inspection.
#[derive(Debug, Default)]
pub struct ResultCell {
    outcome: Mutex<Option<ResultOutcome>>,
}

impl ResultCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Option<ResultOutcome> {
        self.outcome.lock().take()
    }

    fn record(&self, outcome: ResultOutcome) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        } else {
            tracing::warn!(?outcome, "result already reported; ignoring");
        }
    }
}

impl FrameworksResult for ResultCell {
    fn success(&self, result: Option<serde_json::Value>) {
        self.record(ResultOutcome::Success(result));
    }

    fn reject(&self, error: TextCaptureError) {
        self.record(ResultOutcome::Rejected(error));
    }
}
