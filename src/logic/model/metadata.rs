//! Model Metadata - schema shipped next to the model artifact
//!
//! Example `model.json`:
//! ```json
//! {
//!   "feature_names": ["temperature", "humidity", "light"],
//!   "light_scale": "inverted",
//!   "classes": { "0": "safe", "1": "unsafe", "2": "caution" },
//!   "label_output": "label",
//!   "probability_output": "probabilities",
//!   "sha256": "…"
//! }
//! ```
//! `light_scale` has no default: the model must say which channel it
//! was trained on.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::inference::InferenceError;
use crate::logic::features::layout::{validate_feature_names, LightScale};
use crate::logic::labels::LabelTable;

/// Model schema metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Feature names in training column order
    pub feature_names: Vec<String>,
    pub light_scale: LightScale,
    /// Raw class output → label kind
    pub classes: LabelTable,
    #[serde(default)]
    pub label_output: Option<String>,
    #[serde(default)]
    pub probability_output: Option<String>,
    /// Hex SHA-256 of the model file
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// What the pipeline needs from the metadata at classification time
#[derive(Debug, Clone)]
pub struct ModelSchema {
    pub light_scale: LightScale,
    pub classes: LabelTable,
}

impl ModelMetadata {
    /// Load and validate metadata from a JSON file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        if !path.exists() {
            return Err(InferenceError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::Metadata(format!("failed to read {}: {}", path.display(), e)))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, InferenceError> {
        let metadata: ModelMetadata = serde_json::from_str(content)
            .map_err(|e| InferenceError::Metadata(format!("failed to parse: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        validate_feature_names(&self.feature_names)?;

        if self.classes.is_empty() {
            return Err(InferenceError::Metadata("class table is empty".to_string()));
        }

        Ok(())
    }

    pub fn schema(&self) -> ModelSchema {
        ModelSchema {
            light_scale: self.light_scale,
            classes: self.classes.clone(),
        }
    }
}

// ============================================================================
// CHECKSUM
// ============================================================================

/// Hex SHA-256 of a file
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a model file against the checksum recorded in its metadata
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), InferenceError> {
    let actual = file_sha256(path)
        .map_err(|e| InferenceError::Metadata(format!("failed to hash {}: {}", path.display(), e)))?;

    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(InferenceError::Checksum {
            path: path.display().to_string(),
            expected: expected.trim().to_string(),
            actual,
        })
    }
}
