// src/proxy/http.rs

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

use super::{NotifyRequest, RunProxy, StartFuture, StartRequest, StartResponse};
use crate::channel::ProgressChannel;
use crate::engine::{ProgressSink, RunOptions, RunProgress};
use crate::errors::{MergeError, Result};
use crate::types::{ConnectionToken, RunId};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const START_PATH: &str = "/api/mailmerge/start";
pub const NOTIFY_UPDATED_PATH: &str = "/api/mailmerge/notify/updated";
pub const NOTIFY_COMPLETED_PATH: &str = "/api/mailmerge/notify/completed";

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| MergeError::ProxyError(format!("failed to build HTTP client: {e}")))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Error body returned by the server routes.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    kind: String,
}

/// Front-line side of the networked proxy: posts start requests to a worker
/// process and relays the worker's callbacks into the local channel.
#[derive(Debug, Clone)]
pub struct HttpProxy {
    client: reqwest::Client,
    worker_url: String,
    channel: ProgressChannel,
}

impl HttpProxy {
    pub fn new(worker_url: impl Into<String>, channel: ProgressChannel) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            worker_url: worker_url.into(),
            channel,
        })
    }

    pub fn worker_url(&self) -> &str {
        &self.worker_url
    }

    async fn post_start(&self, options: RunOptions) -> Result<RunId> {
        options.validate()?;
        if options.cancel.is_some() {
            warn!(
                template = %options.template_id,
                "cancel signals do not cross the process boundary; ignoring"
            );
        }

        let url = endpoint(&self.worker_url, START_PATH);
        let response = self
            .client
            .post(&url)
            .json(&StartRequest::from_options(&options))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let accepted: StartResponse = response.json().await?;
            debug!(run_id = %accepted.run_id, worker = %self.worker_url, "worker accepted merge run");
            return Ok(accepted.run_id);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        warn!(
            %status,
            template = %options.template_id,
            error = %body.error,
            "worker refused merge run"
        );
        Err(match (status, body.kind.as_str()) {
            (StatusCode::NOT_FOUND, "source_not_found") => MergeError::SourceNotFound(body.error),
            (StatusCode::NOT_FOUND, _) => MergeError::TemplateNotFound(options.template_id),
            (StatusCode::BAD_REQUEST, _) => MergeError::InvalidOptions(body.error),
            _ => MergeError::ProxyError(format!(
                "worker answered {status} to start request: {}",
                body.error
            )),
        })
    }
}

impl RunProxy for HttpProxy {
    fn start(&self, options: RunOptions) -> StartFuture<'_> {
        Box::pin(self.post_start(options))
    }

    fn channel(&self) -> &ProgressChannel {
        &self.channel
    }
}

/// Worker-side handle for calling the front-line back.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    client: reqwest::Client,
    frontline_url: String,
}

impl CallbackClient {
    pub fn new(frontline_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            frontline_url: frontline_url.into(),
        })
    }

    /// Sink for one run. Must be called from within a tokio runtime.
    pub fn sink(&self, run_id: RunId, token: Option<ConnectionToken>) -> HttpCallbackSink {
        HttpCallbackSink::spawn(self.clone(), run_id, token)
    }
}

struct Callback {
    path: &'static str,
    body: NotifyRequest,
}

/// Progress sink posting every snapshot to the front-line notify routes.
///
/// Snapshots are queued and posted one at a time by a single task, so the
/// front-line sees them in row order and the run never waits on HTTP.
/// Failed posts are logged and dropped.
#[derive(Debug)]
pub struct HttpCallbackSink {
    run_id: RunId,
    token: Option<ConnectionToken>,
    queue: UnboundedSender<Callback>,
}

impl HttpCallbackSink {
    fn spawn(target: CallbackClient, run_id: RunId, token: Option<ConnectionToken>) -> Self {
        let (queue, mut rx) = mpsc::unbounded_channel::<Callback>();

        let task_run_id = run_id.clone();
        tokio::spawn(async move {
            while let Some(callback) = rx.recv().await {
                let url = endpoint(&target.frontline_url, callback.path);
                match target.client.post(&url).json(&callback.body).send().await {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!(
                        run_id = %task_run_id,
                        status = %resp.status(),
                        url = %url,
                        "front-line rejected progress callback"
                    ),
                    Err(err) => warn!(
                        run_id = %task_run_id,
                        error = %err,
                        url = %url,
                        "progress callback failed"
                    ),
                }
            }
            debug!(run_id = %task_run_id, "progress callback queue drained");
        });

        Self { run_id, token, queue }
    }

    fn enqueue(&self, path: &'static str, progress: RunProgress) {
        let body = NotifyRequest {
            run_id: self.run_id.clone(),
            connection_token: self.token.clone(),
            progress,
        };
        if self.queue.send(Callback { path, body }).is_err() {
            warn!(run_id = %self.run_id, "progress callback task is gone; dropping snapshot");
        }
    }
}

impl ProgressSink for HttpCallbackSink {
    fn updated(&self, progress: RunProgress) {
        self.enqueue(NOTIFY_UPDATED_PATH, progress);
    }

    fn completed(&self, progress: RunProgress) {
        self.enqueue(NOTIFY_COMPLETED_PATH, progress);
    }
}
