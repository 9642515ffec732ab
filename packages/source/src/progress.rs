//! Progress reporting for the month-by-month fetch.
//!
//! Fetchers report through [`ProgressCallback`] so they do not care
//! whether the binary renders a terminal bar or nothing at all.

use std::sync::Arc;

/// Receives progress updates from a long-running fetch.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of units of work expected.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the work as done with a final message.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by tests and non-interactive callers.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
