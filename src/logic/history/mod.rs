//! History Module - bounded log of processed readings
//!
//! - `record`: `LogRecord` and publish outcome
//! - `state`: shared monitor state (log, current reading, connection)

pub mod record;
pub mod state;

use std::collections::VecDeque;

pub use record::{Delivery, LogRecord};
pub use state::{MonitorState, MonitorStats, StateHandle};

/// Append-only log, oldest evicted first. Order is arrival order.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    records: VecDeque<LogRecord>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a record, returns how many old records were evicted
    pub fn append(&mut self, record: LogRecord) -> usize {
        self.records.push_back(record);

        let mut evicted = 0;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn latest(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    /// Last `n` records, oldest first
    pub fn recent(&self, n: usize) -> Vec<LogRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::labels::LabelKind;
    use chrono::{FixedOffset, TimeZone};

    fn record(seq: u64, label: &str) -> LogRecord {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        LogRecord {
            seq,
            timestamp: tz.timestamp_opt(1_700_000_000 + seq as i64, 0).unwrap(),
            temperature: Some(25.0),
            humidity: None,
            light: None,
            raw_light: None,
            edge_label: Some(label.to_string()),
            label: LabelKind::Unknown,
            raw_prediction: None,
            confidence: None,
            command: "LED_MERAH".to_string(),
            delivery: Delivery::Sent,
        }
    }

    fn labels(log: &HistoryLog) -> Vec<String> {
        log.iter().filter_map(|r| r.edge_label.clone()).collect()
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = HistoryLog::new(3);
        assert_eq!(log.append(record(1, "A")), 0);
        assert_eq!(log.append(record(2, "B")), 0);
        assert_eq!(log.append(record(3, "C")), 0);
        assert_eq!(log.append(record(4, "D")), 1);

        assert_eq!(labels(&log), vec!["B", "C", "D"]);
        assert_eq!(log.latest().unwrap().seq, 4);
    }

    #[test]
    fn test_order_is_append_order_not_time() {
        let mut log = HistoryLog::new(10);
        log.append(record(9, "late"));
        log.append(record(1, "early"));
        assert_eq!(labels(&log), vec!["late", "early"]);
    }

    #[test]
    fn test_recent() {
        let mut log = HistoryLog::new(10);
        for (i, l) in ["A", "B", "C", "D"].iter().enumerate() {
            log.append(record(i as u64, l));
        }
        let recent: Vec<_> = log.recent(2).into_iter().filter_map(|r| r.edge_label).collect();
        assert_eq!(recent, vec!["C", "D"]);
        assert_eq!(log.recent(100).len(), 4);
    }
}
