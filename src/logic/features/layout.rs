//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema the classifier was prepared with.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Model metadata lists the feature names it was trained on; a model whose
//! list differs from `FEATURE_LAYOUT` (including order) is refused at load.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::constants::LIGHT_ADC_MAX;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    "temperature", // 0: degrees Celsius
    "humidity",    // 1: relative humidity percent
    "light",       // 2: light level, scale chosen by `LightScale`
];

/// Total number of features
pub const FEATURE_COUNT: usize = 3;

/// Index of the light channel in the vector
pub const LIGHT_INDEX: usize = 2;

// ============================================================================
// LIGHT SCALE
// ============================================================================

/// Which light channel the classifier expects at `LIGHT_INDEX`.
///
/// The device reports both: `rawLight` straight from the LDR ADC (dark = high)
/// and `light` already inverted so that 4095 means bright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LightScale {
    #[default]
    Inverted,
    Raw,
}

impl LightScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightScale::Inverted => "inverted",
            LightScale::Raw => "raw",
        }
    }

    /// Convert between the two scales (the mapping is its own inverse).
    pub fn flip(value: f64) -> f64 {
        LIGHT_ADC_MAX - value
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Get layout hash
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub light_scale: LightScale,
}

impl LayoutInfo {
    pub fn current(light_scale: LightScale) -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
            light_scale,
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a model's declared feature names don't match the layout
#[derive(Debug, Clone, thiserror::Error)]
#[error("Feature layout mismatch: expected [{}], model declares [{}]", .expected.join(", "), .actual.join(", "))]
pub struct LayoutMismatchError {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Validate a model's feature list against the current layout (order matters)
pub fn validate_feature_names(names: &[String]) -> Result<(), LayoutMismatchError> {
    let matches = names.len() == FEATURE_COUNT
        && names.iter().zip(FEATURE_LAYOUT).all(|(a, b)| a.trim() == *b);

    if matches {
        Ok(())
    } else {
        Err(LayoutMismatchError {
            expected: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
            actual: names.to_vec(),
        })
    }
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================
