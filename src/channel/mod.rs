// src/channel/mod.rs

//! Progress notification channel.
//!
//! Subscribers register under a [`ConnectionToken`] and receive the
//! [`ProgressEvent`]s published for that token, in publish order. Publishing
//! never blocks and never fails: events for tokens nobody listens on are
//! dropped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::engine::ProgressEvent;
use crate::types::ConnectionToken;

/// Registry of live subscribers keyed by connection token.
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct ProgressChannel {
    subscribers: Arc<RwLock<HashMap<ConnectionToken, UnboundedSender<ProgressEvent>>>>,
}

impl ProgressChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. A second subscription under the same token
    /// replaces the first; the old receiver sees its stream end.
    pub fn subscribe(&self, token: ConnectionToken) -> UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if subscribers.insert(token.clone(), tx).is_some() {
            debug!(token = %token, "replaced existing progress subscriber");
        } else {
            debug!(token = %token, "progress subscriber registered");
        }
        rx
    }

    pub fn unsubscribe(&self, token: &ConnectionToken) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.remove(token).is_some()
    }

    /// Deliver `event` to the subscriber behind `token`.
    ///
    /// Returns whether a live subscriber received it. Unknown tokens and
    /// closed receivers are silently skipped; closed ones are forgotten.
    pub fn publish(&self, token: &ConnectionToken, event: ProgressEvent) -> bool {
        let delivered = {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            match subscribers.get(token) {
                Some(tx) => tx.send(event).is_ok(),
                None => {
                    trace!(token = %token, "no subscriber for token; dropping event");
                    return false;
                }
            }
        };
        if delivered {
            return true;
        }

        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if subscribers.get(token).is_some_and(UnboundedSender::is_closed) {
            subscribers.remove(token);
            debug!(token = %token, "removed closed progress subscriber");
        }
        false
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
