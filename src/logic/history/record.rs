use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::logic::labels::LabelKind;

/// Outcome of publishing the record's command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Failed { reason: String },
    /// Loaded back from the CSV mirror; delivery unknown
    Restored,
}

impl Delivery {
    pub fn is_failed(&self) -> bool {
        matches!(self, Delivery::Failed { .. })
    }
}

/// One processed reading. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub seq: u64,
    /// Receipt time in the display timezone
    pub timestamp: DateTime<FixedOffset>,

    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub raw_light: Option<f64>,

    /// Label the device sent, as received
    pub edge_label: Option<String>,
    pub label: LabelKind,
    /// Raw model class, e.g. "1"
    pub raw_prediction: Option<String>,
    pub confidence: Option<f32>,

    pub command: String,
    pub delivery: Delivery,
}
