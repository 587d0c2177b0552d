//! Bounded record history
//!
//! Shared between the directory watcher (writer) and the dashboard (reader).
//! All operations take the same lock, so eviction and insertion are atomic
//! with respect to each other and readers only ever see complete snapshots.

use crate::record::MessageRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// FIFO history capped at `max_history` records
#[derive(Debug)]
pub struct HistoryStore {
    records: Mutex<VecDeque<Arc<MessageRecord>>>,
    max_history: usize,
}

impl HistoryStore {
    /// Create a store. A capacity of zero is treated as one.
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_history.min(1024))),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Append a record, evicting the oldest ones beyond capacity
    pub fn append(&self, record: Arc<MessageRecord>) {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.max_history {
            records.pop_front();
        }
    }

    /// The last `n` records in arrival order
    pub fn recent(&self, n: usize) -> Vec<Arc<MessageRecord>> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(n);
        records.iter().skip(skip).cloned().collect()
    }

    /// The most recently appended record
    pub fn latest(&self) -> Option<Arc<MessageRecord>> {
        self.records.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
