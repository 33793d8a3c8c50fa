//! Ingest Queue - FIFO between the transport worker and the pipeline
//!
//! `push` never blocks on the consumer and never fails. Past the pending
//! limit new events are dropped and counted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use super::events::IngestEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub pushed: u64,
    pub dropped: u64,
    pub pending: usize,
}

pub struct IngestQueue {
    items: Mutex<VecDeque<IngestEvent>>,
    limit: usize,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl IngestQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, event: IngestEvent) {
        let mut items = self.items.lock();
        if items.len() >= self.limit {
            drop(items);
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            // Log the first drop and then every 1000th
            if dropped == 1 || dropped % 1000 == 0 {
                log::warn!(
                    "Ingest queue full ({} pending), dropped {} '{}' event(s) so far",
                    self.limit,
                    dropped,
                    event.kind()
                );
            }
            return;
        }
        items.push_back(event);
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove and return everything queued, in arrival order
    pub fn drain_all(&self) -> Vec<IngestEvent> {
        self.items.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pending: self.len(),
        }
    }
}
