use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coarse cancellation flag shared between a controller and a running batch.
///
/// Checked between batch submissions only; tasks already running finish.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stopped: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}
