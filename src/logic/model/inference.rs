//! Inference Engine - classifier boundary
//!
//! The `Classifier` trait is the seam for model runtimes (ONNX, test
//! doubles). `ClassifierEngine` wraps one with the model schema and turns
//! every outcome, including panics, into a `ClassificationResult`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::metadata::ModelSchema;
use crate::logic::features::layout::LayoutMismatchError;
use crate::logic::features::FeatureVector;
use crate::logic::labels::{ClassificationResult, LabelSource};
use crate::logic::sensor::SensorReading;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model artifact not found: {0}")]
    NotFound(String),
    #[error("model metadata invalid: {0}")]
    Metadata(String),
    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("{0} is not supported by this classifier")]
    Unsupported(&'static str),
    #[error("inference failed: {0}")]
    Runtime(String),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Raw classifier output before it is mapped onto a `LabelKind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class as the model emits it, e.g. "0", "1"
    pub raw_label: String,
    /// `None` when the model has no probability output
    pub confidence: Option<f32>,
}

/// Trait for inference engines (ONNX, test doubles, ...)
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;
    fn classify(&self, features: &FeatureVector) -> Result<Prediction, InferenceError>;
}

// ============================================================================
// ENGINE
// ============================================================================

/// Engine status for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_name: String,
    pub inference_count: u64,
    pub failure_count: u64,
    pub avg_latency_ms: f32,
}

pub struct ClassifierEngine {
    classifier: Arc<dyn Classifier>,
    schema: ModelSchema,
    require_confidence: bool,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
    failure_count: AtomicU64,
}

impl ClassifierEngine {
    pub fn new(classifier: Arc<dyn Classifier>, schema: ModelSchema, require_confidence: bool) -> Self {
        Self {
            classifier,
            schema,
            require_confidence,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        }
    }

    /// Classify one reading. Never fails: a missing feature yields
    /// `unavailable`, any classifier failure yields `error`.
    pub fn classify(&self, reading: &SensorReading) -> ClassificationResult {
        let features = match FeatureVector::from_reading(reading, self.schema.light_scale) {
            Ok(features) => features,
            Err(missing) => {
                log::debug!("Skipping classification: {}", missing);
                return ClassificationResult::unavailable(missing.to_string());
            }
        };

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(&features)));
        self.latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                log::warn!("Classifier '{}' failed: {}", self.classifier.name(), e);
                ClassificationResult::error(e.to_string())
            }
            Err(_) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                log::error!("Classifier '{}' panicked", self.classifier.name());
                ClassificationResult::error("classifier panicked")
            }
        }
    }

    fn run(&self, features: &FeatureVector) -> Result<ClassificationResult, InferenceError> {
        let prediction = self.classifier.classify(features)?;

        let confidence = prediction
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        if self.require_confidence && confidence.is_none() {
            return Err(InferenceError::Unsupported("confidence"));
        }

        Ok(ClassificationResult {
            label: self.schema.classes.resolve(&prediction.raw_label),
            raw_label: Some(prediction.raw_label),
            confidence,
            source: LabelSource::Model,
            detail: None,
        })
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_name: self.classifier.name().to_string(),
            inference_count: count,
            failure_count: self.failure_count.load(Ordering::Relaxed),
            avg_latency_ms: avg,
        }
    }
}
