// src/schedule/mod.rs

//! Recurring trigger bindings and their validation.
//!
//! Validation is advisory: it is used by `check-schedule` and at the start
//! of `schedule`, and never stops a run from being started directly.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod clock;
pub mod registry;

pub use clock::spawn_clock_trigger;
pub use registry::TriggerRegistry;

/// Handler name a trigger must carry to start merge runs.
pub const MERGE_ENTRY_POINT: &str = "run_merge";

/// Kind of event that activates a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Time-based activation.
    Clock,
    OnOpen,
    OnEdit,
    OnFormSubmit,
}

/// An externally scheduled activation bound to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Document (tabular source id) the trigger is bound to.
    pub document: String,

    #[serde(rename = "event")]
    pub event_kind: EventKind,

    pub handler: String,

    /// Template to run when the trigger fires.
    #[serde(default)]
    pub template: Option<String>,

    /// Period for clock triggers, e.g. `"1h"`.
    #[serde(default)]
    pub every: Option<String>,
}

impl Trigger {
    /// Clock trigger bound to `document` with the merge entry point.
    pub fn clock(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            event_kind: EventKind::Clock,
            handler: MERGE_ENTRY_POINT.to_string(),
            template: None,
            every: None,
        }
    }
}

/// Check a single trigger: time-based, and wired to the merge entry point.
pub fn validate_trigger(trigger: &Trigger) -> bool {
    if trigger.event_kind != EventKind::Clock {
        warn!(
            document = %trigger.document,
            event = ?trigger.event_kind,
            "invalid trigger event type"
        );
        return false;
    }
    if trigger.handler != MERGE_ENTRY_POINT {
        warn!(
            document = %trigger.document,
            handler = %trigger.handler,
            expected = MERGE_ENTRY_POINT,
            "invalid trigger handler"
        );
        return false;
    }
    true
}

/// Check the triggers bound to one document.
///
/// Exactly one trigger must be bound, and it must pass [`validate_trigger`].
pub fn validate_triggers(bound: &[Trigger]) -> bool {
    debug!(count = bound.len(), "validating bound triggers");
    if bound.len() != 1 {
        warn!(count = bound.len(), "incorrect number of triggers");
        return false;
    }
    validate_trigger(&bound[0])
}
