//! Shared monitor state. Written by the pipeline only; everyone else reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::{HistoryLog, LogRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonitorStats {
    /// Sensor records appended since start
    pub processed: u64,
    pub publish_failures: u64,
    pub classifier_errors: u64,
    pub evicted: u64,
    pub raw_messages: u64,
    pub transport_errors: u64,
    /// Records loaded from the CSV mirror at startup
    pub restored: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorState {
    pub history: HistoryLog,
    /// Most recent record, survives eviction of the log
    pub current: Option<LogRecord>,
    /// `None` until the transport reports for the first time
    pub connected: Option<bool>,
    pub connection_changed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    /// Last non-JSON payload, for troubleshooting devices
    pub last_raw: Option<String>,
    pub stats: MonitorStats,
}

impl MonitorState {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HistoryLog::new(capacity),
            current: None,
            connected: None,
            connection_changed_at: None,
            last_error: None,
            last_error_at: None,
            last_raw: None,
            stats: MonitorStats::default(),
        }
    }

    /// Append and track the current reading
    pub(in crate::logic) fn append(&mut self, record: LogRecord) {
        self.current = Some(record.clone());
        self.stats.evicted += self.history.append(record) as u64;
        self.stats.processed += 1;
    }
}

/// Cloneable handle to the shared state
#[derive(Clone)]
pub struct StateHandle(Arc<RwLock<MonitorState>>);

impl StateHandle {
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(RwLock::new(MonitorState::new(capacity))))
    }

    pub fn read<R>(&self, f: impl FnOnce(&MonitorState) -> R) -> R {
        f(&self.0.read())
    }

    pub(in crate::logic) fn write<R>(&self, f: impl FnOnce(&mut MonitorState) -> R) -> R {
        f(&mut self.0.write())
    }

    /// Seed the log with previously persisted records, keeping the newest
    /// that fit.
    pub(in crate::logic) fn restore(&self, records: Vec<LogRecord>) -> usize {
        self.write(|state| {
            let skip = records.len().saturating_sub(state.history.capacity());
            let mut restored = 0;
            for record in records.into_iter().skip(skip) {
                state.history.append(record);
                restored += 1;
            }
            state.current = state.history.latest().cloned();
            state.stats.restored += restored as u64;
            restored
        })
    }

    pub fn len(&self) -> usize {
        self.read(|s| s.history.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read(|s| s.history.is_empty())
    }
}
