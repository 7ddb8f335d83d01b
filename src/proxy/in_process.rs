// src/proxy/in_process.rs

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{RunProxy, StartFuture};
use crate::channel::ProgressChannel;
use crate::engine::{MergeWorker, ProgressSink, RunOptions, RunProgress};
use crate::errors::Result;
use crate::types::{ConnectionToken, RunId};

/// Runs merges on tokio tasks in the current process.
#[derive(Debug, Clone)]
pub struct InProcessProxy {
    worker: Arc<MergeWorker>,
    channel: ProgressChannel,
}

impl InProcessProxy {
    pub fn new(worker: Arc<MergeWorker>, channel: ProgressChannel) -> Self {
        Self { worker, channel }
    }

    /// Prepare the run synchronously, then spawn it.
    ///
    /// Returns the join handle as well, for callers (the CLI, tests) that
    /// want to await the final snapshot themselves. Must be called from
    /// within a tokio runtime.
    pub fn launch(&self, options: RunOptions) -> Result<(RunId, JoinHandle<Result<RunProgress>>)> {
        let run_id = RunId::generate();
        let prepared = self.worker.prepare(run_id.clone(), options)?;

        let sink: Arc<dyn ProgressSink> = Arc::new(NotifySink {
            proxy: self.clone(),
            run_id: run_id.clone(),
            token: prepared.connection_token.clone(),
        });

        let worker = Arc::clone(&self.worker);
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            let result = worker.execute(prepared, sink).await;
            if let Err(err) = &result {
                warn!(run_id = %task_run_id, error = %err, "merge run ended with an error");
            }
            result
        });

        debug!(run_id = %run_id, "merge run handed to worker task");
        Ok((run_id, handle))
    }
}

impl RunProxy for InProcessProxy {
    fn start(&self, options: RunOptions) -> StartFuture<'_> {
        Box::pin(async move { self.launch(options).map(|(run_id, _handle)| run_id) })
    }

    fn channel(&self) -> &ProgressChannel {
        &self.channel
    }
}

/// Worker-side sink that calls straight back into the proxy.
struct NotifySink {
    proxy: InProcessProxy,
    run_id: RunId,
    token: Option<ConnectionToken>,
}

impl ProgressSink for NotifySink {
    fn updated(&self, progress: RunProgress) {
        self.proxy
            .notify_updated(&self.run_id, self.token.as_ref(), progress);
    }

    fn completed(&self, progress: RunProgress) {
        self.proxy
            .notify_completed(&self.run_id, self.token.as_ref(), progress);
    }
}
