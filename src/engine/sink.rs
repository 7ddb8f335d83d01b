// src/engine/sink.rs

use tracing::trace;

use super::RunProgress;

/// Where a running merge publishes its snapshots.
///
/// Both calls are fire-and-forget: an implementation must not block the
/// run and must not fail it. `completed` is called exactly once per run,
/// after every `updated` call.
pub trait ProgressSink: Send + Sync {
    fn updated(&self, progress: RunProgress);
    fn completed(&self, progress: RunProgress);
}

/// Sink for runs nobody is listening to.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ProgressSink for DiscardSink {
    fn updated(&self, progress: RunProgress) {
        trace!(run_id = %progress.run_id, completed = progress.completed, "progress discarded");
    }

    fn completed(&self, progress: RunProgress) {
        trace!(run_id = %progress.run_id, state = ?progress.state, "terminal progress discarded");
    }
}
