//! Model Module - classification engine
//!
//! - `inference`: `Classifier` trait and the failure-isolating engine
//! - `metadata`: model schema (feature order, light scale, classes)
//! - `onnx`: ONNX Runtime implementation

pub mod inference;
pub mod metadata;
pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use inference::{Classifier, ClassifierEngine, EngineStatus, InferenceError, Prediction};
pub use metadata::{ModelMetadata, ModelSchema};
pub use onnx::OnnxClassifier;

use crate::logic::config::ModelConfig;
use crate::logic::features::LightScale;

/// Model status for the dashboard, fixed at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub engine: String,
    pub model_path: String,
    pub model_version: Option<String>,
    pub light_scale: Option<LightScale>,
    /// Why the model is not loaded
    pub reason: Option<String>,
}

/// Load the configured model. Returns the engine (if any) and the status
/// to show; a missing or invalid artifact is not fatal.
pub fn load_configured(config: &ModelConfig) -> (Option<ClassifierEngine>, ModelStatus) {
    let mut status = ModelStatus {
        engine: "none".to_string(),
        model_path: config.model_path.display().to_string(),
        ..Default::default()
    };

    if !config.enabled {
        log::info!("Server-side classification disabled by configuration");
        status.reason = Some("disabled".to_string());
        return (None, status);
    }

    match load_engine(&config.model_path, &config.metadata_path, config.require_confidence) {
        Ok((engine, metadata)) => {
            status.loaded = true;
            status.engine = "onnx".to_string();
            status.model_version = metadata.model_version.clone();
            status.light_scale = Some(metadata.light_scale);
            (Some(engine), status)
        }
        Err(e) => {
            log::warn!("Model not loaded ({}) - server prediction disabled", e);
            status.reason = Some(e.to_string());
            (None, status)
        }
    }
}

fn load_engine(
    model_path: &Path,
    metadata_path: &Path,
    require_confidence: bool,
) -> Result<(ClassifierEngine, ModelMetadata), InferenceError> {
    let metadata = ModelMetadata::load(metadata_path)?;
    let classifier = OnnxClassifier::load(model_path, &metadata)?;
    let engine = ClassifierEngine::new(Arc::new(classifier), metadata.schema(), require_confidence);
    Ok((engine, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifacts_degrade_to_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            enabled: true,
            model_path: dir.path().join("model.onnx"),
            metadata_path: dir.path().join("model.json"),
            require_confidence: false,
        };

        let (engine, status) = load_configured(&config);
        assert!(engine.is_none());
        assert!(!status.loaded);
        assert!(status.reason.unwrap().contains("not found"));
    }

    #[test]
    fn test_disabled_model() {
        let config = ModelConfig {
            enabled: false,
            ..Default::default()
        };
        let (engine, status) = load_configured(&config);
        assert!(engine.is_none());
        assert_eq!(status.reason.as_deref(), Some("disabled"));
    }
}
