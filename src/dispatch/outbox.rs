// src/dispatch/outbox.rs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{DispatchError, DispatchFuture, MessageDispatcher, OutgoingMessage};

#[derive(Debug, Serialize)]
struct OutboxRecord<'a> {
    sent_at: DateTime<Utc>,
    #[serde(flatten)]
    message: &'a OutgoingMessage,
}

/// Appends each message as one JSON line to an outbox file that a
/// delivery agent drains.
///
/// The file is reopened for every message. Failing to open or write it
/// means the transport is unusable, which ends the run.
#[derive(Debug)]
pub struct OutboxDispatcher {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OutboxDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageDispatcher for OutboxDispatcher {
    fn send<'a>(&'a self, message: &'a OutgoingMessage) -> DispatchFuture<'a> {
        Box::pin(async move {
            let record = OutboxRecord {
                sent_at: Utc::now(),
                message,
            };
            let mut line = serde_json::to_string(&record)
                .map_err(|e| DispatchError::Rejected(format!("serializing message: {e}")))?;
            line.push('\n');

            let _guard = self.write_lock.lock().await;

            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| {
                    DispatchError::Unavailable(format!(
                        "opening outbox {}: {e}",
                        self.path.display()
                    ))
                })?;

            file.write_all(line.as_bytes()).await.map_err(|e| {
                DispatchError::Unavailable(format!("writing outbox {}: {e}", self.path.display()))
            })?;
            file.flush().await.map_err(|e| {
                DispatchError::Unavailable(format!("flushing outbox {}: {e}", self.path.display()))
            })?;

            debug!(
                run_id = %message.run_id,
                row = message.row_index,
                outbox = %self.path.display(),
                "message appended to outbox"
            );
            Ok(())
        })
    }
}
