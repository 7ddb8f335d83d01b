// src/schedule/registry.rs

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::info;

use super::{Trigger, validate_triggers};

/// Triggers bound per document.
///
/// Safe to share across tasks; all access goes through an `RwLock`.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    bound: RwLock<BTreeMap<String, Vec<Trigger>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triggers(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        let registry = Self::new();
        for trigger in triggers {
            registry.bind(trigger);
        }
        registry
    }

    pub fn bind(&self, trigger: Trigger) {
        let mut bound = self.bound.write().unwrap_or_else(|e| e.into_inner());
        bound
            .entry(trigger.document.clone())
            .or_default()
            .push(trigger);
    }

    pub fn triggers_for(&self, document: &str) -> Vec<Trigger> {
        let bound = self.bound.read().unwrap_or_else(|e| e.into_inner());
        bound.get(document).cloned().unwrap_or_default()
    }

    /// Every document that has at least one binding.
    pub fn documents(&self) -> Vec<String> {
        let bound = self.bound.read().unwrap_or_else(|e| e.into_inner());
        bound.keys().cloned().collect()
    }

    /// Remove every trigger bound to `document`; returns how many were removed.
    pub fn delete_all(&self, document: &str) -> usize {
        let mut bound = self.bound.write().unwrap_or_else(|e| e.into_inner());
        let removed = bound.remove(document).map(|t| t.len()).unwrap_or(0);
        if removed > 0 {
            info!(document, removed, "deleted triggers");
        }
        removed
    }

    /// Run the schedule validator over `document`'s bindings.
    pub fn validate_document(&self, document: &str) -> bool {
        validate_triggers(&self.triggers_for(document))
    }
}
