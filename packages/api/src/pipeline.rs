//! Scale, classify and shape predictions for single samples and batches.
//!
//! The single path range-checks before inference and answers atypical
//! measurements with the `unknown` sentinel. The batch path skips the range
//! check and aborts on the first failing sample unless [`BatchPolicy`] asks
//! otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use iris_model::{ClassLabels, Classifier, ModelBundle, ModelError, Scaler};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::features::{FeatureVector, RangeProfile, ValidationError};

pub const OUT_OF_RANGE_WARNING: &str = "Measurements outside typical Iris range";
pub const UNKNOWN_SPECIES: &str = "unknown";
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
/// Allowed distance of a probability vector's sum from 1.
const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("classifier returned class {index} but only {count} labels are known")]
    UnknownClass { index: usize, count: usize },

    #[error("classifier returned an invalid probability distribution: {0}")]
    InvalidDistribution(String),

    #[error("sample {sample_id}: {source}")]
    Sample {
        sample_id: usize,
        #[source]
        source: Box<PredictionError>,
    },
}

/// Label, confidence and distribution for one scaled sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub label: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PredictionResult {
    pub predicted_species: String,
    /// Highest class probability.
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub measurements: FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OutOfRange {
    pub warning: String,
    pub predicted_species: String,
}

impl Default for OutOfRange {
    fn default() -> Self {
        Self {
            warning: OUT_OF_RANGE_WARNING.to_string(),
            predicted_species: UNKNOWN_SPECIES.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SingleOutcome {
    Classified(PredictionResult),
    OutOfRange(OutOfRange),
}

impl SingleOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SingleOutcome::Classified(_) => "classified",
            SingleOutcome::OutOfRange(_) => "out_of_range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BatchPrediction {
    pub sample_id: usize,
    pub predicted_species: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    /// The sample exactly as submitted.
    #[schema(value_type = Object)]
    pub measurements: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BatchOutOfRange {
    pub sample_id: usize,
    pub warning: String,
    pub predicted_species: String,
    #[schema(value_type = Object)]
    pub measurements: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BatchFailure {
    pub sample_id: usize,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum BatchEntry {
    Classified(BatchPrediction),
    OutOfRange(BatchOutOfRange),
    Failed(BatchFailure),
}

impl BatchEntry {
    pub fn sample_id(&self) -> usize {
        match self {
            BatchEntry::Classified(entry) => entry.sample_id,
            BatchEntry::OutOfRange(entry) => entry.sample_id,
            BatchEntry::Failed(entry) => entry.sample_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BatchResult {
    pub total_samples: usize,
    pub predictions: Vec<BatchEntry>,
}

/// How `/predict_multiple` treats failing and atypical samples.
///
/// The default aborts the whole batch on the first failure and classifies
/// every sample regardless of the range profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub isolate_failures: bool,
    pub range_check: bool,
    pub max_batch_size: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            isolate_failures: false,
            range_check: false,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// The read-only collaborators shared by every request.
#[derive(Clone)]
pub struct Predictor {
    scaler: Arc<dyn Scaler>,
    classifier: Arc<dyn Classifier>,
    labels: ClassLabels,
    range: RangeProfile,
}

impl Predictor {
    pub fn new(
        scaler: Arc<dyn Scaler>,
        classifier: Arc<dyn Classifier>,
        labels: ClassLabels,
    ) -> Self {
        Self {
            scaler,
            classifier,
            labels,
            range: RangeProfile::IRIS,
        }
    }

    pub fn from_bundle(bundle: ModelBundle) -> Self {
        let (scaler, classifier, labels) = bundle.into_parts();
        Self::new(scaler, classifier, labels)
    }

    /// Scale, classify, and map the class index to its label.
    pub fn infer(&self, features: &FeatureVector) -> Result<Inference, PredictionError> {
        let scaled = self.scaler.transform(&features.to_array())?;
        let index = self.classifier.predict(&scaled)?;
        let proba = self.classifier.predict_proba(&scaled)?;

        if proba.len() != self.labels.len() {
            return Err(PredictionError::InvalidDistribution(format!(
                "{} probabilities for {} labels",
                proba.len(),
                self.labels.len()
            )));
        }
        if let Some(p) = proba
            .iter()
            .find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p))
        {
            return Err(PredictionError::InvalidDistribution(format!(
                "probability {p} is outside [0, 1]"
            )));
        }
        let sum: f64 = proba.iter().sum();
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(PredictionError::InvalidDistribution(format!(
                "probabilities sum to {sum}"
            )));
        }

        let label = self
            .labels
            .name(index)
            .ok_or(PredictionError::UnknownClass {
                index,
                count: self.labels.len(),
            })?
            .to_string();
        let confidence = proba.iter().copied().fold(0.0, f64::max);
        let probabilities = self.labels.names().iter().cloned().zip(proba).collect();

        Ok(Inference {
            label,
            confidence,
            probabilities,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<SingleOutcome, PredictionError> {
        let violations = self.range.violations(features);
        if !violations.is_empty() {
            tracing::info!(?violations, "Measurements outside typical range, skipping inference");
            return Ok(SingleOutcome::OutOfRange(OutOfRange::default()));
        }

        let inference = self.infer(features)?;
        Ok(SingleOutcome::Classified(PredictionResult {
            predicted_species: inference.label,
            confidence: inference.confidence,
            probabilities: inference.probabilities,
            measurements: *features,
        }))
    }

    /// Classifies `samples` in order; `sample_id` is the position in the input.
    pub fn predict_batch(
        &self,
        samples: &[Value],
        policy: &BatchPolicy,
    ) -> Result<BatchResult, PredictionError> {
        if samples.is_empty() {
            return Err(ValidationError::NoSamples.into());
        }
        if samples.len() > policy.max_batch_size {
            return Err(ValidationError::TooManySamples {
                count: samples.len(),
                limit: policy.max_batch_size,
            }
            .into());
        }

        let mut predictions = Vec::with_capacity(samples.len());
        for (sample_id, sample) in samples.iter().enumerate() {
            match self.predict_sample(sample_id, sample, policy.range_check) {
                Ok(entry) => predictions.push(entry),
                Err(err) if policy.isolate_failures => {
                    tracing::warn!(sample_id, error = %err, "Batch sample failed");
                    predictions.push(BatchEntry::Failed(BatchFailure {
                        sample_id,
                        error: "Prediction failed".to_string(),
                        message: err.to_string(),
                    }));
                }
                Err(err) => {
                    return Err(PredictionError::Sample {
                        sample_id,
                        source: Box::new(err),
                    });
                }
            }
        }

        Ok(BatchResult {
            total_samples: predictions.len(),
            predictions,
        })
    }

    fn predict_sample(
        &self,
        sample_id: usize,
        sample: &Value,
        range_check: bool,
    ) -> Result<BatchEntry, PredictionError> {
        let features = FeatureVector::from_value(sample)?;

        if range_check && !self.range.contains(&features) {
            return Ok(BatchEntry::OutOfRange(BatchOutOfRange {
                sample_id,
                warning: OUT_OF_RANGE_WARNING.to_string(),
                predicted_species: UNKNOWN_SPECIES.to_string(),
                measurements: sample.clone(),
            }));
        }

        let inference = self.infer(&features)?;
        Ok(BatchEntry::Classified(BatchPrediction {
            sample_id,
            predicted_species: inference.label,
            confidence: inference.confidence,
            probabilities: inference.probabilities,
            measurements: sample.clone(),
        }))
    }
}
