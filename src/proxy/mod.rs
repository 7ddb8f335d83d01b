// src/proxy/mod.rs

//! Cross-process run proxy.
//!
//! [`RunProxy::start`] hands a run to a worker and returns as soon as the
//! worker has accepted it. Progress flows back through
//! [`RunProxy::notify_updated`] / [`RunProxy::notify_completed`] into the
//! caller-side [`ProgressChannel`].
//!
//! Two implementations:
//! - [`InProcessProxy`]: the worker is a tokio task in this process.
//! - [`HttpProxy`]: the worker is another process reached over HTTP; it
//!   calls back through [`HttpCallbackSink`].

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::channel::ProgressChannel;
use crate::engine::{ProgressEvent, RunOptions, RunProgress};
use crate::errors::Result;
use crate::types::{ConnectionToken, RunId};

pub mod http;
pub mod in_process;

pub use http::{CallbackClient, HttpCallbackSink, HttpProxy};
pub use in_process::InProcessProxy;

/// Future returned by [`RunProxy::start`].
pub type StartFuture<'a> = Pin<Box<dyn Future<Output = Result<RunId>> + Send + 'a>>;

pub trait RunProxy: Send + Sync {
    /// Hand `options` to a worker. Resolves once the run is accepted, never
    /// waits for it to make progress. Validation and not-found errors are
    /// returned here; row failures never are.
    fn start(&self, options: RunOptions) -> StartFuture<'_>;

    /// Caller-side channel the notify calls relay into.
    fn channel(&self) -> &ProgressChannel;

    fn notify_updated(
        &self,
        run_id: &RunId,
        token: Option<&ConnectionToken>,
        progress: RunProgress,
    ) {
        relay(self.channel(), run_id, token, ProgressEvent::Updated(progress));
    }

    /// Same shape as `notify_updated`; always the last call for a run.
    fn notify_completed(
        &self,
        run_id: &RunId,
        token: Option<&ConnectionToken>,
        progress: RunProgress,
    ) {
        relay(
            self.channel(),
            run_id,
            token,
            ProgressEvent::Completed(progress),
        );
    }
}

fn relay(
    channel: &ProgressChannel,
    run_id: &RunId,
    token: Option<&ConnectionToken>,
    event: ProgressEvent,
) {
    let Some(token) = token else {
        trace!(run_id = %run_id, "run has no connection token; event not relayed");
        return;
    };
    let terminal = event.is_terminal();
    let delivered = channel.publish(token, event);
    debug!(run_id = %run_id, token = %token, terminal, delivered, "progress relayed");
}

/// Body of `POST /api/mailmerge/start`, on both the front-line and the
/// worker side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub merge_template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_token: Option<ConnectionToken>,
}

impl StartRequest {
    pub fn from_options(options: &RunOptions) -> Self {
        Self {
            merge_template_id: options.template_id.clone(),
            connection_token: options.connection_token.clone(),
        }
    }

    pub fn into_options(self) -> RunOptions {
        RunOptions {
            template_id: self.merge_template_id,
            connection_token: self.connection_token,
            cancel: None,
        }
    }
}

/// Body of a `202 Accepted` answer to a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub run_id: RunId,
}

/// Body of the worker -> front-line notify callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_token: Option<ConnectionToken>,
    pub progress: RunProgress,
}
