//! Feature Vector - Core data structure for classifier input
//!
//! **Versioned feature vector with layout validation**
//!
//! Built only from readings where every feature is present; a missing
//! field is reported instead of being filled in.

use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, LightScale, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION,
};
use crate::logic::sensor::SensorReading;

// ============================================================================
// MISSING FEATURE
// ============================================================================

/// A reading lacked one of the layout's features, or its value does not
/// fit in an `f32`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feature '{0}' is missing or out of range")]
pub struct MissingFeature(pub &'static str);

fn feature(value: Option<f64>, name: &'static str) -> Result<f32, MissingFeature> {
    value
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .ok_or(MissingFeature(name))
}

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Values in the order defined by FEATURE_LAYOUT
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create from raw values with current version
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Map a reading onto the layout: temperature, humidity, light.
    pub fn from_reading(reading: &SensorReading, scale: LightScale) -> Result<Self, MissingFeature> {
        let temperature = feature(reading.temperature, FEATURE_LAYOUT[0])?;
        let humidity = feature(reading.humidity, FEATURE_LAYOUT[1])?;
        let light = feature(reading.light_on(scale), FEATURE_LAYOUT[2])?;

        Ok(Self::from_values([temperature, humidity, light]))
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Check if this vector was built with the current layout
    pub fn is_compatible(&self) -> bool {
        self.version == FEATURE_VERSION && self.layout_hash == layout_hash()
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}
