//! Sensor Reading - decoding of one inbound message
//!
//! Missing-field policy: every numeric field is `Option<f64>`. A key that is
//! absent, null, non-numeric, or not finite decodes to `None`; nothing is
//! coerced to zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logic::features::layout::LightScale;

/// Accepted keys per field, first match wins
const TEMPERATURE_KEYS: &[&str] = &["temperature", "temp", "suhu"];
const HUMIDITY_KEYS: &[&str] = &["humidity", "hum", "lembap"];
const LIGHT_KEYS: &[&str] = &["light"];
const RAW_LIGHT_KEYS: &[&str] = &["rawLight", "raw_light"];
const LABEL_KEYS: &[&str] = &["label", "status"];

/// One decoded reading. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub received_at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Inverted scale, 4095 = bright
    pub light: Option<f64>,
    /// LDR ADC value as sampled
    pub raw_light: Option<f64>,
    /// Label computed on the device, if it sent one
    pub edge_label: Option<String>,
}

impl SensorReading {
    /// Decode a JSON object payload
    pub fn decode(payload: &Map<String, Value>, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            temperature: number_field(payload, TEMPERATURE_KEYS),
            humidity: number_field(payload, HUMIDITY_KEYS),
            light: number_field(payload, LIGHT_KEYS),
            raw_light: number_field(payload, RAW_LIGHT_KEYS),
            edge_label: text_field(payload, LABEL_KEYS),
        }
    }

    /// Light value on the requested scale, converting from the other
    /// channel when only that one was reported.
    pub fn light_on(&self, scale: LightScale) -> Option<f64> {
        match scale {
            LightScale::Inverted => self.light.or(self.raw_light.map(LightScale::flip)),
            LightScale::Raw => self.raw_light.or(self.light.map(LightScale::flip)),
        }
    }
}

/// Parse a JSON value as a finite number
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn number_field(payload: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| payload.get(*key))
        .and_then(parse_number)
}

fn text_field(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = keys.iter().find_map(|key| payload.get(*key))?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
