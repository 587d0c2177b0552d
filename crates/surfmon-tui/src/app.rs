//! Dashboard state

use chrono::{DateTime, Local};
use std::sync::Arc;
use surfmon_core::{HistoryStore, MessageRecord};

/// Rows shown in the recent messages table
pub const RECENT_ROWS: usize = 10;

/// Read-only handle on the state the dashboard renders
pub struct Dashboard {
    history: Arc<HistoryStore>,
    forwarding_enabled: bool,
}

impl Dashboard {
    pub fn new(history: Arc<HistoryStore>, forwarding_enabled: bool) -> Self {
        Self {
            history,
            forwarding_enabled,
        }
    }

    /// Capture what one frame needs. Only the history lock is taken, briefly.
    pub fn snapshot(&self) -> DashboardView {
        let recent = self.history.recent(RECENT_ROWS);
        DashboardView {
            now: Local::now(),
            forwarding_enabled: self.forwarding_enabled,
            total: self.history.len(),
            latest: recent.last().cloned(),
            recent,
        }
    }
}

/// One frame's worth of dashboard state
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub now: DateTime<Local>,
    pub forwarding_enabled: bool,
    /// Records held in history
    pub total: usize,
    /// Most recent records, oldest first
    pub recent: Vec<Arc<MessageRecord>>,
    pub latest: Option<Arc<MessageRecord>>,
}
