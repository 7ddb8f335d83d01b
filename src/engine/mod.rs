// src/engine/mod.rs

//! Merge run orchestration.
//!
//! A run moves `Pending -> Running -> {Completed, Failed, Cancelled}`:
//! - [`core`] holds the pure, synchronous [`RunTracker`] that owns the
//!   state machine and the counters.
//! - [`runtime`] is the async shell ([`MergeRun`]) that reads rows, renders
//!   them, calls the dispatcher and publishes snapshots.
//! - [`worker`] resolves templates and sources and starts runs.
//! - [`sink`] is where a run publishes its progress.

use serde::{Deserialize, Serialize};

use crate::errors::{MergeError, Result};
use crate::types::{CancelSignal, ConnectionToken, RunId, TemplateId};

pub mod core;
pub mod runtime;
pub mod sink;
pub mod worker;

pub use self::core::RunTracker;
pub use runtime::{MergeRun, RunSettings};
pub use sink::{DiscardSink, ProgressSink};
pub use worker::{MergeWorker, PreparedRun};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepted; row count not yet known.
    Pending,
    Running,
    Completed,
    /// Aborted by a run-fatal condition.
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }
}

/// Detail of the most recent failure in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Data row the failure belongs to; `None` for run-level failures
    /// that happened before any row was read.
    pub row_index: Option<usize>,
    pub message: String,
}

/// Snapshot of a run's progress. Each snapshot is self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: RunId,
    pub template_id: TemplateId,
    pub state: RunState,
    pub total: usize,
    /// Rows visited so far, failed rows included.
    pub completed: usize,
    pub failed: usize,
    pub terminal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorDetail>,
}

/// Typed progress message relayed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "progress", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A row finished (sent or failed).
    Updated(RunProgress),
    /// The run reached a terminal state. Always the last event of a run.
    Completed(RunProgress),
}

impl ProgressEvent {
    pub fn progress(&self) -> &RunProgress {
        match self {
            ProgressEvent::Updated(p) | ProgressEvent::Completed(p) => p,
        }
    }

    pub fn into_progress(self) -> RunProgress {
        match self {
            ProgressEvent::Updated(p) | ProgressEvent::Completed(p) => p,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Completed(_))
    }
}

/// Parameters for one merge run, consumed once.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub template_id: TemplateId,
    /// Subscriber that should receive progress events.
    pub connection_token: Option<ConnectionToken>,
    pub cancel: Option<CancelSignal>,
}

impl RunOptions {
    pub fn new(template_id: impl Into<TemplateId>) -> Self {
        Self {
            template_id: template_id.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<ConnectionToken>) -> Self {
        self.connection_token = Some(token.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Reject options that can never start a run.
    pub fn validate(&self) -> Result<()> {
        if self.template_id.trim().is_empty() {
            return Err(MergeError::InvalidOptions(
                "merge template id is required".to_string(),
            ));
        }
        Ok(())
    }
}
