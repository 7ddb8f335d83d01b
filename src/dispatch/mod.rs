// src/dispatch/mod.rs

//! Message dispatch layer.
//!
//! The orchestrator talks to a [`MessageDispatcher`] instead of a concrete
//! mail provider. This keeps delivery details out of the pipeline and lets
//! tests swap in a recording fake.
//!
//! - [`outbox`] appends every message to a JSON-lines outbox file.
//! - [`log`] only logs messages (and can echo them for dry runs).
//!
//! Failures are split by scope: [`DispatchError::Rejected`] and
//! [`DispatchError::TimedOut`] affect one row, [`DispatchError::Unavailable`]
//! means the transport itself is unusable and the run must stop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigFile, DispatchKind};
use crate::merge::{MergeTemplate, RenderedMessage};
use crate::types::{RunId, TemplateId};

pub mod log;
pub mod outbox;

pub use log::LogDispatcher;
pub use outbox::OutboxDispatcher;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The provider refused this one message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// No answer within the configured bound.
    #[error("dispatch timed out after {0:?}")]
    TimedOut(Duration),

    /// The transport cannot be used at all (e.g. expired credentials).
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl DispatchError {
    /// Whether this failure ends the whole run rather than one row.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, DispatchError::Unavailable(_))
    }
}

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub run_id: RunId,
    pub template_id: TemplateId,
    /// Data row index (0 = first row below the header).
    pub row_index: usize,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    /// Column the send time belongs in, if the template tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_column: Option<String>,
    /// Stable across re-runs of the same row content; lets a provider
    /// drop duplicate deliveries.
    pub idempotency_key: String,
}

impl OutgoingMessage {
    pub fn new(
        run_id: RunId,
        template: &MergeTemplate,
        row_index: usize,
        rendered: RenderedMessage,
    ) -> Self {
        let idempotency_key = fingerprint(&template.id, row_index, &rendered);
        Self {
            run_id,
            template_id: template.id.clone(),
            row_index,
            to: rendered.to,
            cc: rendered.cc,
            bcc: rendered.bcc,
            subject: rendered.subject,
            body: rendered.body,
            logged_column: template.logged_column_name(),
            idempotency_key,
        }
    }
}

fn fingerprint(template_id: &str, row_index: usize, rendered: &RenderedMessage) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(template_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(row_index as u64).to_le_bytes());
    for part in [&rendered.to, &rendered.subject, &rendered.body] {
        hasher.update(&[0]);
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Boxed future returned by [`MessageDispatcher::send`].
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>>;

/// Trait abstracting how rendered messages are delivered.
///
/// Production code uses [`OutboxDispatcher`] or [`LogDispatcher`]; tests
/// provide their own implementation.
pub trait MessageDispatcher: Send + Sync {
    fn send<'a>(&'a self, message: &'a OutgoingMessage) -> DispatchFuture<'a>;
}

/// Build the dispatcher selected by `[dispatch]`.
pub fn from_config(cfg: &ConfigFile) -> Arc<dyn MessageDispatcher> {
    match cfg.dispatch.kind {
        DispatchKind::Log => Arc::new(LogDispatcher::new()),
        DispatchKind::Outbox => Arc::new(OutboxDispatcher::new(
            cfg.resolve_path(&cfg.dispatch.outbox_path),
        )),
    }
}
