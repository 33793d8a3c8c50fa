//! Ingest Events - what the transport worker hands to the pipeline
//!
//! Only `Sensor` events become history records. The others update
//! connection state for display.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Event kind names
pub mod kinds {
    pub const SENSOR: &str = "sensor";
    pub const STATUS: &str = "status";
    pub const ERROR: &str = "error";
    pub const RAW: &str = "raw";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IngestEvent {
    /// JSON object received on a subscribed topic
    Sensor {
        topic: String,
        payload: Map<String, Value>,
        received_at: DateTime<Utc>,
    },
    /// Connection went up or down
    Status {
        connected: bool,
        at: DateTime<Utc>,
    },
    /// Transport-level failure
    Error {
        message: String,
        at: DateTime<Utc>,
    },
    /// Payload that is not a JSON object
    Raw {
        topic: String,
        payload: String,
        at: DateTime<Utc>,
    },
}

impl IngestEvent {
    /// Decode an inbound message. Invalid UTF-8 is replaced, never rejected.
    pub fn decode(topic: &str, bytes: &[u8], at: DateTime<Utc>) -> Self {
        let text = String::from_utf8_lossy(bytes);

        match decode_object(&text) {
            Some(payload) => IngestEvent::Sensor {
                topic: topic.to_string(),
                payload,
                received_at: at,
            },
            None => IngestEvent::Raw {
                topic: topic.to_string(),
                payload: text.into_owned(),
                at,
            },
        }
    }

    pub fn status(connected: bool) -> Self {
        IngestEvent::Status {
            connected,
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        IngestEvent::Error {
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IngestEvent::Sensor { .. } => kinds::SENSOR,
            IngestEvent::Status { .. } => kinds::STATUS,
            IngestEvent::Error { .. } => kinds::ERROR,
            IngestEvent::Raw { .. } => kinds::RAW,
        }
    }
}

/// Parse a JSON object. A field whose value cannot be represented
/// (e.g. `1e400`) is kept as its source text so the field alone decodes
/// to absent, not the whole object.
fn decode_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Some(map),
        Ok(_) => return None,
        Err(_) => {}
    }

    let fields: BTreeMap<String, Box<RawValue>> = serde_json::from_str(text).ok()?;
    Some(
        fields
            .into_iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str::<Value>(raw.get())
                    .unwrap_or_else(|_| Value::String(raw.get().to_string()));
                (key, value)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_is_sensor() {
        let event = IngestEvent::decode("t", br#"{"temperature": 25}"#, Utc::now());
        assert_eq!(event.kind(), kinds::SENSOR);
        if let IngestEvent::Sensor { topic, payload, .. } = event {
            assert_eq!(topic, "t");
            assert_eq!(payload["temperature"], 25);
        }
    }

    #[test]
    fn test_non_object_is_raw() {
        for bytes in [&b"[1,2,3]"[..], b"42", b"hello", b""] {
            assert_eq!(IngestEvent::decode("t", bytes, Utc::now()).kind(), kinds::RAW);
        }
    }

    #[test]
    fn test_out_of_range_number_keeps_object() {
        let bytes = br#"{"temperature": 1e400, "humidity": 60, "label": "aman"}"#;
        match IngestEvent::decode("t", bytes, Utc::now()) {
            IngestEvent::Sensor { payload, .. } => {
                assert_eq!(payload["humidity"], 60);
                assert_eq!(payload["label"], "aman");
                assert_eq!(payload["temperature"], "1e400");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncated_object_is_raw() {
        let event = IngestEvent::decode("t", br#"{"temperature": 25"#, Utc::now());
        assert_eq!(event.kind(), kinds::RAW);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let event = IngestEvent::decode("t", &[0x66, 0xff, 0x6f], Utc::now());
        match event {
            IngestEvent::Raw { payload, .. } => assert_eq!(payload, "f\u{fffd}o"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
