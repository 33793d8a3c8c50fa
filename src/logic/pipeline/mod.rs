//! Pipeline - ingest, classify, actuate, log
//!
//! `run_once` drains the ingest queue and handles each event in arrival
//! order. Nothing in the per-event path propagates an error: a failing
//! classifier yields an `error` label, a failing publish yields a failed
//! delivery, and the record is appended either way.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::{Map, Value};

use crate::logic::events::IngestEvent;
use crate::logic::history::{Delivery, LogRecord, StateHandle};
use crate::logic::labels::{ClassificationResult, CommandTable, LabelKind, LabelSource, LabelTable};
use crate::logic::model::ClassifierEngine;
use crate::logic::persistence::CsvMirror;
use crate::logic::queue::IngestQueue;
use crate::logic::sensor::SensorReading;
use crate::logic::transport::CommandPublisher;

pub struct Pipeline {
    queue: Arc<IngestQueue>,
    state: StateHandle,
    classifier: Option<Arc<ClassifierEngine>>,
    edge_labels: LabelTable,
    commands: CommandTable,
    publisher: Arc<dyn CommandPublisher>,
    output_topic: String,
    mirror: Option<CsvMirror>,
    offset: FixedOffset,
    next_seq: u64,
}

impl Pipeline {
    pub fn new(
        queue: Arc<IngestQueue>,
        state: StateHandle,
        publisher: Arc<dyn CommandPublisher>,
        output_topic: impl Into<String>,
    ) -> Self {
        let next_seq = state.read(|s| s.history.latest().map(|r| r.seq + 1).unwrap_or(1));

        Self {
            queue,
            state,
            classifier: None,
            edge_labels: LabelTable::default(),
            commands: CommandTable::default(),
            publisher,
            output_topic: output_topic.into(),
            mirror: None,
            offset: Utc.fix(),
            next_seq,
        }
    }

    pub fn with_classifier(mut self, engine: Option<Arc<ClassifierEngine>>) -> Self {
        self.classifier = engine;
        self
    }

    pub fn with_tables(mut self, edge_labels: LabelTable, commands: CommandTable) -> Self {
        self.edge_labels = edge_labels;
        self.commands = commands;
        self
    }

    pub fn with_mirror(mut self, mirror: Option<CsvMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Process everything queued. Returns true if at least one record was
    /// appended to the history log.
    pub fn run_once(&mut self) -> bool {
        let events = self.queue.drain_all();
        if events.is_empty() {
            return false;
        }

        let mut appended = 0usize;
        for event in events {
            match event {
                IngestEvent::Sensor {
                    topic,
                    payload,
                    received_at,
                } => {
                    let record = self.process_reading(&topic, &payload, received_at);
                    self.state.write(|s| s.append(record));
                    appended += 1;
                }
                IngestEvent::Status { connected, at } => self.state.write(|s| {
                    if s.connected != Some(connected) {
                        log::info!("Broker connection: {}", if connected { "up" } else { "down" });
                        s.connected = Some(connected);
                        s.connection_changed_at = Some(at);
                    }
                }),
                IngestEvent::Error { message, at } => self.state.write(|s| {
                    s.last_error = Some(message);
                    s.last_error_at = Some(at);
                    s.stats.transport_errors += 1;
                }),
                IngestEvent::Raw { topic, payload, .. } => {
                    log::debug!("Non-JSON payload on '{}': {:?}", topic, payload);
                    self.state.write(|s| {
                        s.last_raw = Some(payload);
                        s.stats.raw_messages += 1;
                    })
                }
            }
        }

        if appended == 0 {
            return false;
        }

        if let Some(mirror) = &self.mirror {
            self.state.read(|s| mirror.mirror(s.history.iter()));
        }
        true
    }

    fn process_reading(
        &mut self,
        topic: &str,
        payload: &Map<String, Value>,
        received_at: DateTime<Utc>,
    ) -> LogRecord {
        let reading = SensorReading::decode(payload, received_at);
        let result = self.classify(&reading);

        let command = self.commands.command_for(result.label).to_string();
        if self.commands.is_fail_safe(result.label) {
            log::debug!("Label '{}' has no command, sending fail-safe '{}'", result.label, command);
        }

        let delivery = match self.publisher.publish(&self.output_topic, &command) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                log::warn!("Publishing '{}' to '{}' failed: {}", command, self.output_topic, e);
                Delivery::Failed { reason: e.to_string() }
            }
        };

        self.state.write(|s| {
            if result.label == LabelKind::Error {
                s.stats.classifier_errors += 1;
            }
            if delivery.is_failed() {
                s.stats.publish_failures += 1;
            }
        });

        let seq = self.next_seq;
        self.next_seq += 1;

        log::debug!(
            "#{} from '{}': label={} ({:?}) command={}",
            seq,
            topic,
            result.label,
            result.source,
            command
        );

        LogRecord {
            seq,
            timestamp: received_at.with_timezone(&self.offset),
            temperature: reading.temperature,
            humidity: reading.humidity,
            light: reading.light,
            raw_light: reading.raw_light,
            raw_prediction: if result.source == LabelSource::Model {
                result.raw_label
            } else {
                None
            },
            edge_label: reading.edge_label,
            label: result.label,
            confidence: result.confidence,
            command,
            delivery,
        }
    }

    /// Classifier when configured, otherwise the device's own label
    fn classify(&self, reading: &SensorReading) -> ClassificationResult {
        if let Some(engine) = &self.classifier {
            return engine.classify(reading);
        }

        match reading.edge_label.as_deref() {
            Some(raw) => ClassificationResult {
                label: self.edge_labels.resolve(raw),
                raw_label: Some(raw.to_string()),
                confidence: None,
                source: LabelSource::Edge,
                detail: None,
            },
            None => ClassificationResult::unavailable("no classifier and no edge label"),
        }
    }
}
