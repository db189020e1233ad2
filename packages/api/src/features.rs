//! Feature vectors, the typical-range profile, and request body validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Required measurement keys, in the order the model consumes them.
pub const FEATURE_NAMES: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required features: {}", .missing.join(", "))]
    MissingFeatures { missing: Vec<&'static str> },

    #[error("feature `{field}` must be a finite number, got {found}")]
    InvalidFeature { field: &'static str, found: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("no samples provided")]
    NoSamples,

    #[error("{count} samples exceed the batch limit of {limit}")]
    TooManySamples { count: usize, limit: usize },
}

/// One flower sample, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureVector {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
}

impl FeatureVector {
    /// Parses a request object. Presence of every key is checked before any
    /// value is inspected, so a body that lacks keys always reports
    /// `MissingFeatures`. Keys other than the four features are ignored.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or_else(|| {
            ValidationError::InvalidBody(format!("expected a JSON object, got {value}"))
        })?;

        let missing: Vec<&'static str> = FEATURE_NAMES
            .iter()
            .copied()
            .filter(|name| !object.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFeatures { missing });
        }

        let read = |field: &'static str| {
            let raw = &object[field];
            raw.as_f64()
                .filter(|x| x.is_finite())
                .ok_or_else(|| ValidationError::InvalidFeature {
                    field,
                    found: raw.to_string(),
                })
        };

        Ok(Self {
            sepal_length: read("sepal_length")?,
            sepal_width: read("sepal_width")?,
            petal_length: read("petal_length")?,
            petal_width: read("petal_width")?,
        })
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Plausible per-feature bounds. Samples outside them are not classified on
/// the single prediction path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeProfile {
    pub sepal_length: Bounds,
    pub sepal_width: Bounds,
    pub petal_length: Bounds,
    pub petal_width: Bounds,
}

impl RangeProfile {
    pub const IRIS: RangeProfile = RangeProfile {
        sepal_length: Bounds::new(4.0, 8.0),
        sepal_width: Bounds::new(2.0, 4.5),
        petal_length: Bounds::new(1.0, 7.0),
        petal_width: Bounds::new(0.1, 2.5),
    };

    pub fn contains(&self, features: &FeatureVector) -> bool {
        self.violations(features).is_empty()
    }

    /// Names of the features that fall outside their bounds.
    pub fn violations(&self, features: &FeatureVector) -> Vec<&'static str> {
        let bounds = [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ];
        FEATURE_NAMES
            .iter()
            .zip(bounds.iter().zip(features.to_array()))
            .filter(|(_, (bounds, value))| !bounds.contains(*value))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Default for RangeProfile {
    fn default() -> Self {
        Self::IRIS
    }
}
