// src/engine/core.rs

//! Pure core of a merge run.
//!
//! [`RunTracker`] owns the state machine and the counters and hands back the
//! snapshot to publish after every transition. It has no channels, no Tokio
//! types and performs no IO, so it can be tested exhaustively on its own.
//!
//! Every method returns `None` when the transition is not allowed from the
//! current state. In particular a terminal state can be entered only once,
//! which is what guarantees a single terminal event per run.

use super::{ErrorDetail, RunProgress, RunState};
use crate::types::{RunId, TemplateId};

#[derive(Debug, Clone)]
pub struct RunTracker {
    progress: RunProgress,
}

impl RunTracker {
    pub fn new(run_id: RunId, template_id: TemplateId) -> Self {
        Self {
            progress: RunProgress {
                run_id,
                template_id,
                state: RunState::Pending,
                total: 0,
                completed: 0,
                failed: 0,
                terminal: false,
                last_error: None,
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.progress.state
    }

    pub fn snapshot(&self) -> RunProgress {
        self.progress.clone()
    }

    /// `Pending -> Running` once the row count is known.
    pub fn start(&mut self, total: usize) -> Option<RunProgress> {
        if self.progress.state != RunState::Pending {
            return None;
        }
        self.progress.state = RunState::Running;
        self.progress.total = total;
        Some(self.snapshot())
    }

    /// A row was dispatched successfully.
    pub fn record_success(&mut self) -> Option<RunProgress> {
        if !self.can_record() {
            return None;
        }
        self.progress.completed += 1;
        Some(self.snapshot())
    }

    /// A row failed; the run carries on.
    pub fn record_failure(
        &mut self,
        row_index: usize,
        message: impl Into<String>,
    ) -> Option<RunProgress> {
        if !self.can_record() {
            return None;
        }
        self.progress.completed += 1;
        self.progress.failed += 1;
        self.progress.last_error = Some(ErrorDetail {
            row_index: Some(row_index),
            message: message.into(),
        });
        Some(self.snapshot())
    }

    /// `Running -> Completed`.
    pub fn complete(&mut self) -> Option<RunProgress> {
        if self.progress.state != RunState::Running {
            return None;
        }
        self.enter_terminal(RunState::Completed)
    }

    /// `Pending | Running -> Failed`. The failing row, if any, is not counted.
    pub fn fail(
        &mut self,
        row_index: Option<usize>,
        message: impl Into<String>,
    ) -> Option<RunProgress> {
        if self.progress.state.is_terminal() {
            return None;
        }
        self.progress.last_error = Some(ErrorDetail {
            row_index,
            message: message.into(),
        });
        self.enter_terminal(RunState::Failed)
    }

    /// `Pending | Running -> Cancelled`, counters frozen as they are.
    pub fn cancel(&mut self) -> Option<RunProgress> {
        if self.progress.state.is_terminal() {
            return None;
        }
        self.enter_terminal(RunState::Cancelled)
    }

    fn can_record(&self) -> bool {
        self.progress.state == RunState::Running && self.progress.completed < self.progress.total
    }

    fn enter_terminal(&mut self, state: RunState) -> Option<RunProgress> {
        self.progress.state = state;
        self.progress.terminal = true;
        Some(self.snapshot())
    }
}
