// src/engine/worker.rs

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::dispatch::{self, MessageDispatcher};
use crate::errors::{MergeError, Result};
use crate::merge::{MergeTemplate, StaticTemplates, TemplateRepository};
use crate::sheet::{CsvSourceResolver, SourceResolver, TabularSource};
use crate::types::{CancelSignal, ConnectionToken, RunId};

use super::runtime::{MergeRun, RunSettings};
use super::sink::ProgressSink;
use super::{RunOptions, RunProgress};

/// A run whose template and source have been resolved, ready to execute.
#[derive(Debug)]
pub struct PreparedRun {
    pub run_id: RunId,
    pub template: MergeTemplate,
    pub source: Arc<dyn TabularSource>,
    pub connection_token: Option<ConnectionToken>,
    pub cancel: Option<CancelSignal>,
}

/// Worker-side owner of everything a merge run needs.
///
/// Runs do not share mutable state with each other; a worker can execute
/// any number of them concurrently.
pub struct MergeWorker {
    templates: Arc<dyn TemplateRepository>,
    sources: Arc<dyn SourceResolver>,
    dispatcher: Arc<dyn MessageDispatcher>,
    settings: RunSettings,
}

impl std::fmt::Debug for MergeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeWorker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MergeWorker {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        sources: Arc<dyn SourceResolver>,
        dispatcher: Arc<dyn MessageDispatcher>,
        settings: RunSettings,
    ) -> Self {
        Self {
            templates,
            sources,
            dispatcher,
            settings,
        }
    }

    /// Wire a worker from config: templates from `[template.*]`, CSV
    /// sources from `[source.*]`, dispatcher from `[dispatch]`.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Ok(Self::new(
            Arc::new(StaticTemplates::from_config(cfg)),
            Arc::new(CsvSourceResolver::new(cfg.source_paths())),
            dispatch::from_config(cfg),
            RunSettings::from_config(cfg)?,
        ))
    }

    /// Replace the dispatcher (e.g. for dry runs).
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Validate options and resolve the template and its source.
    ///
    /// Everything that can be rejected up front is rejected here, before a
    /// run exists: blank template id, unknown template, unknown source.
    pub fn prepare(&self, run_id: RunId, options: RunOptions) -> Result<PreparedRun> {
        options.validate()?;

        let template = self.templates.get(&options.template_id).ok_or_else(|| {
            warn!(run_id = %run_id, template = %options.template_id, "merge template not found");
            MergeError::TemplateNotFound(options.template_id.clone())
        })?;

        let source = self.sources.open(&template.source).inspect_err(|err| {
            warn!(
                run_id = %run_id,
                template = %template.id,
                source = %template.source,
                error = %err,
                "tabular source not found"
            );
        })?;

        Ok(PreparedRun {
            run_id,
            template,
            source,
            connection_token: options.connection_token,
            cancel: options.cancel,
        })
    }

    /// Execute a prepared run to completion, publishing into `sink`.
    pub async fn execute(
        &self,
        prepared: PreparedRun,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<RunProgress> {
        info!(
            run_id = %prepared.run_id,
            template = %prepared.template.id,
            token = ?prepared.connection_token.as_ref().map(ConnectionToken::as_str),
            "executing merge run"
        );

        MergeRun::new(
            prepared.run_id,
            prepared.template,
            prepared.source,
            Arc::clone(&self.dispatcher),
            sink,
            self.settings,
        )
        .with_cancel(prepared.cancel)
        .run()
        .await
    }
}
