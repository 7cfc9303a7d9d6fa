use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Thread-safe on/off switch. Repeated calls in the same direction are no-ops.
#[derive(Debug, Default)]
pub struct GatingFlag {
    enabled: AtomicBool,
}

impl GatingFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn enable(&self) {
        if self
            .enabled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("listener forwarding enabled");
        }
    }

    pub fn disable(&self) {
        if self
            .enabled
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("listener forwarding disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
