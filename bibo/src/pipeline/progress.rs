//! Progress reporting for analysis runs.

/// Receives progress of a run, independent of any UI toolkit.
pub trait ProgressSink: Sync {
    /// `current` of `total` stages finished.
    fn on_progress(&self, current: usize, total: usize);

    fn on_completed(&self) {}

    fn on_failed(&self, _reason: &str) {}
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _current: usize, _total: usize) {}
}
