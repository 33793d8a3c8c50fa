//! Label Types
//!
//! Closed set of status kinds a reading can end up with.

use serde::{Deserialize, Serialize};

// ============================================================================
// LABEL KIND
// ============================================================================

/// Status of one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// Environment within normal range
    Safe,
    /// Borderline, keep an eye on it
    Caution,
    /// Outside safe range
    Unsafe,
    /// A label was produced but is not in any alias table
    Unknown,
    /// The classifier failed on this reading
    Error,
    /// No label could be produced (no classifier and no edge label, or a
    /// required feature was missing)
    Unavailable,
}

impl LabelKind {
    pub const ALL: [LabelKind; 6] = [
        LabelKind::Safe,
        LabelKind::Caution,
        LabelKind::Unsafe,
        LabelKind::Unknown,
        LabelKind::Error,
        LabelKind::Unavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelKind::Safe => "safe",
            LabelKind::Caution => "caution",
            LabelKind::Unsafe => "unsafe",
            LabelKind::Unknown => "unknown",
            LabelKind::Error => "error",
            LabelKind::Unavailable => "unavailable",
        }
    }

    /// Parse the canonical lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Display color for charts and status badges
    pub fn color(&self) -> &'static str {
        match self {
            LabelKind::Safe => "green",
            LabelKind::Caution => "orange",
            LabelKind::Unsafe => "red",
            LabelKind::Unknown | LabelKind::Error | LabelKind::Unavailable => "gray",
        }
    }
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// Where a label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Model,
    Edge,
    None,
}

/// Result of classifying one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: LabelKind,
    /// Raw class output, e.g. "1" from the model or "Aman" from the device
    pub raw_label: Option<String>,
    /// In [0, 1] when the classifier reports it
    pub confidence: Option<f32>,
    pub source: LabelSource,
    /// Why the label is `error` or `unavailable`
    pub detail: Option<String>,
}

impl ClassificationResult {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            label: LabelKind::Unavailable,
            raw_label: None,
            confidence: None,
            source: LabelSource::None,
            detail: Some(detail.into()),
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            label: LabelKind::Error,
            raw_label: None,
            confidence: None,
            source: LabelSource::Model,
            detail: Some(detail.into()),
        }
    }
}
