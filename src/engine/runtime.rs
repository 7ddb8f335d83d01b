// src/engine/runtime.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::dispatch::{DispatchError, MessageDispatcher, OutgoingMessage};
use crate::errors::{MergeError, Result};
use crate::merge::MergeTemplate;
use crate::sheet::accessor::row_mapping;
use crate::sheet::{SheetAccessor, TabularSource};
use crate::types::{CancelSignal, RunId, parse_duration};

use super::core::RunTracker;
use super::sink::ProgressSink;
use super::RunProgress;

/// Knobs shared by every run a worker executes.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// 1-based header row position.
    pub header_row: usize,
    /// Upper bound for one dispatch call; hitting it fails only that row.
    pub dispatch_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            header_row: 1,
            dispatch_timeout: Duration::from_secs(30),
        }
    }
}

impl RunSettings {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let dispatch_timeout = parse_duration(&cfg.config.dispatch_timeout)
            .map_err(|e| MergeError::ConfigError(format!("[config].dispatch_timeout: {e}")))?;
        Ok(Self {
            header_row: cfg.config.header_row,
            dispatch_timeout,
        })
    }
}

/// Result of processing a single row.
#[derive(Debug)]
enum RowOutcome {
    Sent,
    Failed(String),
    Fatal(String),
}

/// Async shell around [`RunTracker`]: drives one run from its first row to
/// its terminal event.
///
/// The header row is read once when the run starts and reused for every
/// row; data rows are re-read from the source one at a time.
pub struct MergeRun {
    run_id: RunId,
    template: MergeTemplate,
    source: Arc<dyn TabularSource>,
    dispatcher: Arc<dyn MessageDispatcher>,
    sink: Arc<dyn ProgressSink>,
    cancel: Option<CancelSignal>,
    settings: RunSettings,
}

impl fmt::Debug for MergeRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeRun")
            .field("run_id", &self.run_id)
            .field("template", &self.template.id)
            .field("source", &self.source.id())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MergeRun {
    pub fn new(
        run_id: RunId,
        template: MergeTemplate,
        source: Arc<dyn TabularSource>,
        dispatcher: Arc<dyn MessageDispatcher>,
        sink: Arc<dyn ProgressSink>,
        settings: RunSettings,
    ) -> Self {
        Self {
            run_id,
            template,
            source,
            dispatcher,
            sink,
            cancel: None,
            settings,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive the run to a terminal state.
    ///
    /// Row failures are recorded and never returned. A run-fatal condition
    /// (unreadable header, unusable transport) publishes a `Failed` terminal
    /// event and is returned as an error.
    pub async fn run(self) -> Result<RunProgress> {
        let mut tracker = RunTracker::new(self.run_id.clone(), self.template.id.clone());
        let accessor = SheetAccessor::new(self.settings.header_row);

        info!(
            run_id = %self.run_id,
            template = %self.template.id,
            source = self.source.id(),
            "merge run started"
        );

        let (headers, total) = match self.read_shape(&accessor) {
            Ok(shape) => shape,
            Err(err) => {
                error!(run_id = %self.run_id, error = %err, "could not read source header");
                let step = tracker.fail(None, err.to_string());
                self.publish_terminal(&tracker, step);
                return Err(err);
            }
        };

        self.warn_unknown_tags(&headers);
        tracker.start(total);
        debug!(run_id = %self.run_id, total, "rows to merge");

        for row_index in 0..total {
            if self.is_cancelled() {
                info!(run_id = %self.run_id, row = row_index, "merge run cancelled");
                let step = tracker.cancel();
                return Ok(self.publish_terminal(&tracker, step));
            }

            let step = match self.process_row(&accessor, &headers, row_index).await {
                RowOutcome::Sent => tracker.record_success(),
                RowOutcome::Failed(message) => {
                    warn!(run_id = %self.run_id, row = row_index, error = %message, "row failed");
                    tracker.record_failure(row_index, message)
                }
                RowOutcome::Fatal(message) => {
                    error!(
                        run_id = %self.run_id,
                        row = row_index,
                        error = %message,
                        "transport unusable; aborting merge run"
                    );
                    let step = tracker.fail(Some(row_index), message.clone());
                    self.publish_terminal(&tracker, step);
                    return Err(MergeError::TransportFatal(message));
                }
            };

            if let Some(progress) = step {
                self.sink.updated(progress);
            }
        }

        let step = tracker.complete();
        let progress = self.publish_terminal(&tracker, step);
        info!(
            run_id = %self.run_id,
            total = progress.total,
            failed = progress.failed,
            "merge run completed"
        );
        Ok(progress)
    }

    fn read_shape(&self, accessor: &SheetAccessor) -> Result<(Vec<String>, usize)> {
        let headers = accessor.header_row(self.source.as_ref())?;
        let total = accessor.data_row_count(self.source.as_ref())?;
        Ok((headers, total))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }

    async fn process_row(
        &self,
        accessor: &SheetAccessor,
        headers: &[String],
        row_index: usize,
    ) -> RowOutcome {
        let values = match accessor.row_values(self.source.as_ref(), row_index) {
            Ok(values) => values,
            Err(err) => return RowOutcome::Failed(format!("reading row: {err}")),
        };

        let row = row_mapping(headers, values);
        let rendered = self.template.render_row(&row);
        if rendered.to.is_empty() {
            return RowOutcome::Failed("no recipient after substitution".to_string());
        }

        let message = OutgoingMessage::new(self.run_id.clone(), &self.template, row_index, rendered);

        match timeout(self.settings.dispatch_timeout, self.dispatcher.send(&message)).await {
            Ok(Ok(())) => {
                debug!(run_id = %self.run_id, row = row_index, to = %message.to, "row sent");
                RowOutcome::Sent
            }
            Ok(Err(err)) if err.is_run_fatal() => RowOutcome::Fatal(err.to_string()),
            Ok(Err(err)) => RowOutcome::Failed(err.to_string()),
            Err(_elapsed) => {
                RowOutcome::Failed(DispatchError::TimedOut(self.settings.dispatch_timeout).to_string())
            }
        }
    }

    /// Tags without a matching header render empty; say so once per run.
    fn warn_unknown_tags(&self, headers: &[String]) {
        let known: HashSet<&str> = headers.iter().map(String::as_str).collect();
        let missing: Vec<String> = self
            .template
            .referenced_tags()
            .into_iter()
            .filter(|tag| !known.contains(tag.as_str()))
            .collect();

        if !missing.is_empty() {
            warn!(
                run_id = %self.run_id,
                template = %self.template.id,
                ?missing,
                "template references tags with no matching header; they will render empty"
            );
        }
    }

    /// Publish the terminal snapshot. The tracker refuses a second terminal
    /// transition, so this sends at most one event per run.
    fn publish_terminal(&self, tracker: &RunTracker, step: Option<RunProgress>) -> RunProgress {
        match step {
            Some(progress) => {
                self.sink.completed(progress.clone());
                progress
            }
            None => {
                error!(run_id = %self.run_id, state = ?tracker.state(), "terminal event already published");
                tracker.snapshot()
            }
        }
    }
}
