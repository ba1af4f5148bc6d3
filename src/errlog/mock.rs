use super::FailureSink;
use crate::models::CaptionFailure;
use std::sync::{Arc, Mutex};

/// Keeps failures in memory; clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryErrorLog {
    records: Arc<Mutex<Vec<CaptionFailure>>>,
}

impl MemoryErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CaptionFailure> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FailureSink for MemoryErrorLog {
    fn record(&self, failure: &CaptionFailure) {
        self.records.lock().unwrap().push(failure.clone());
    }
}
