use std::sync::{Arc, Mutex};

use mailmerge::engine::{ProgressEvent, ProgressSink, RunProgress};

/// Progress sink that keeps every event in publish order.
#[derive(Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<RunProgress> {
        self.events()
            .into_iter()
            .filter(|e| !e.is_terminal())
            .map(ProgressEvent::into_progress)
            .collect()
    }

    pub fn terminals(&self) -> Vec<RunProgress> {
        self.events()
            .into_iter()
            .filter(ProgressEvent::is_terminal)
            .map(ProgressEvent::into_progress)
            .collect()
    }
}

impl ProgressSink for CollectingSink {
    fn updated(&self, progress: RunProgress) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Updated(progress));
    }

    fn completed(&self, progress: RunProgress) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Completed(progress));
    }
}
