//! ONNX Runtime Classifier
//!
//! Expects a classifier exported with integer class labels (first output,
//! or `label_output`) and optionally a `[1, n_classes]` float probability
//! tensor (second output, or `probability_output`). Exports that emit
//! probabilities as a sequence of maps (zipmap) are not supported.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DynValue, Value};
use parking_lot::Mutex;

use super::inference::{Classifier, InferenceError, Prediction};
use super::metadata::{verify_checksum, ModelMetadata};
use crate::logic::features::{FeatureVector, FEATURE_COUNT};

pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    label_output: String,
    probability_output: Option<String>,
}

fn runtime<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> InferenceError + '_ {
    move |e| InferenceError::Runtime(format!("{}: {}", context, e))
}

impl OnnxClassifier {
    /// Load an ONNX model and bind its outputs according to the metadata
    pub fn load(model_path: &Path, metadata: &ModelMetadata) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(InferenceError::NotFound(model_path.display().to_string()));
        }

        if let Some(expected) = &metadata.sha256 {
            verify_checksum(model_path, expected)?;
            log::info!("Model checksum verified");
        }

        let session = Session::builder()
            .map_err(runtime("failed to create session builder"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime("failed to set optimization"))?
            .commit_from_file(model_path)
            .map_err(runtime("failed to load model"))?;

        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let label_output = match &metadata.label_output {
            Some(name) if outputs.contains(name) => name.clone(),
            Some(name) => {
                return Err(InferenceError::Metadata(format!(
                    "label output '{}' not in model outputs {:?}",
                    name, outputs
                )))
            }
            None => outputs
                .first()
                .cloned()
                .ok_or_else(|| InferenceError::Metadata("model defines no outputs".to_string()))?,
        };

        let probability_output = match &metadata.probability_output {
            Some(name) if outputs.contains(name) => Some(name.clone()),
            Some(name) => {
                return Err(InferenceError::Metadata(format!(
                    "probability output '{}' not in model outputs {:?}",
                    name, outputs
                )))
            }
            None => outputs.get(1).cloned(),
        };

        let name = metadata
            .model_version
            .clone()
            .unwrap_or_else(|| model_path.display().to_string());

        log::info!(
            "ONNX model loaded (labels: '{}', probabilities: {:?})",
            label_output,
            probability_output
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            label_output,
            probability_output,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, features: &FeatureVector) -> Result<Prediction, InferenceError> {
        let input_array = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), features.as_slice().to_vec())
            .map_err(|e| InferenceError::Runtime(format!("array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array).map_err(runtime("tensor error"))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(runtime("inference failed"))?;

        let label_value = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| InferenceError::Runtime(format!("no output '{}'", self.label_output)))?;
        let raw_label = extract_label(label_value)?;

        let confidence = self
            .probability_output
            .as_deref()
            .and_then(|name| outputs.get(name))
            .and_then(|value| value.try_extract_tensor::<f32>().ok())
            .and_then(|(_, probabilities)| probabilities.iter().copied().reduce(f32::max));

        Ok(Prediction {
            raw_label,
            confidence,
        })
    }
}

/// Read the predicted class from the label output
fn extract_label(value: &DynValue) -> Result<String, InferenceError> {
    if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
        return data
            .first()
            .map(|v| v.to_string())
            .ok_or_else(|| InferenceError::Runtime("empty label tensor".to_string()));
    }

    if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
        return match data.len() {
            0 => Err(InferenceError::Runtime("empty label tensor".to_string())),
            1 => Ok(format_class(data[0])),
            // Scores per class: take the argmax index
            _ => data
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i.to_string())
                .ok_or_else(|| InferenceError::Runtime("empty score tensor".to_string())),
        };
    }

    Err(InferenceError::Runtime(
        "label output is neither int64 nor float32".to_string(),
    ))
}

/// 1.0 → "1", keeps fractional values as-is
fn format_class(value: f32) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
