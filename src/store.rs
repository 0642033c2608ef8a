use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::report::EventReport;

/// Index into the report store: (topic, reporting user).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub topic: String,
    pub user: String,
}

impl ReportKey {
    pub fn new(topic: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            user: user.into(),
        }
    }
}

/// Append-only store of reports received during one session.
///
/// Each key keeps its reports in arrival order. Nothing is ever removed; the
/// whole store is dropped with the session.
#[derive(Debug, Default)]
pub struct ReportStore {
    reports: Mutex<HashMap<ReportKey, Vec<EventReport>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReportKey, Vec<EventReport>>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `report` to the sequence stored for (topic, user).
    pub fn append(&self, topic: &str, user: &str, report: EventReport) {
        self.lock()
            .entry(ReportKey::new(topic, user))
            .or_default()
            .push(report);
    }

    /// Copy of the reports stored for (topic, user); empty when none arrived.
    pub fn fetch(&self, topic: &str, user: &str) -> Vec<EventReport> {
        self.lock()
            .get(&ReportKey::new(topic, user))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of stored reports across all keys.
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
