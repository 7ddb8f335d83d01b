use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mailmerge::dispatch::{DispatchError, DispatchFuture, MessageDispatcher, OutgoingMessage};

/// A fake dispatcher that:
/// - records every message it "delivers"
/// - fails selected rows with a configured [`DispatchError`]
/// - optionally sleeps before answering, per row or for every row.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    attempts: Arc<Mutex<Vec<usize>>>,
    failures: Arc<Mutex<HashMap<usize, DispatchError>>>,
    delays: Arc<Mutex<HashMap<usize, Duration>>>,
    delay: Option<Duration>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long before answering the send for `row`.
    pub fn delay_row(self, row: usize, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(row, delay);
        self
    }

    pub fn fail_row(self, row: usize, error: DispatchError) -> Self {
        self.failures.lock().unwrap().insert(row, error);
        self
    }

    /// Row-level rejection of `row`.
    pub fn reject_row(self, row: usize) -> Self {
        self.fail_row(row, DispatchError::Rejected(format!("row {row} bounced")))
    }

    /// Transport becomes unusable when `row` is sent.
    pub fn fatal_at_row(self, row: usize) -> Self {
        self.fail_row(row, DispatchError::Unavailable("credentials expired".into()))
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_rows(&self) -> Vec<usize> {
        self.sent().iter().map(|m| m.row_index).collect()
    }

    /// Row indices of every send call, successful or not.
    pub fn attempted_rows(&self) -> Vec<usize> {
        self.attempts.lock().unwrap().clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn send<'a>(&'a self, message: &'a OutgoingMessage) -> DispatchFuture<'a> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(message.row_index);

            let delay = self
                .delays
                .lock()
                .unwrap()
                .get(&message.row_index)
                .copied()
                .or(self.delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let failure = self.failures.lock().unwrap().get(&message.row_index).cloned();
            if let Some(err) = failure {
                return Err(err);
            }

            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        })
    }
}
