//! Persisted model artifact and the startup bootstrap around it.
//!
//! A bundle holds the scaler, the classifier and the class labels the
//! classifier was fitted with. At startup the service loads the bundle from
//! disk; when that fails it fits a fresh default model on the bundled Iris
//! dataset and, optionally, persists it for the next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use linfa::Dataset;
use ndarray::{Array1, Ix1};
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, GaussianNaiveBayes};
use crate::error::{ModelError, Result};
use crate::labels::ClassLabels;
use crate::N_FEATURES;
use crate::scaler::{Scaler, StandardScaler};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub labels: ClassLabels,
    pub scaler: StandardScaler,
    pub classifier: GaussianNaiveBayes,
}

impl ModelBundle {
    /// Fits the scaler on all records, then the classifier on the scaled
    /// records. Target `i` of the dataset is labelled `labels.name(i)`.
    pub fn fit(dataset: &Dataset<f64, usize, Ix1>, labels: ClassLabels) -> Result<Self> {
        let scaler = StandardScaler::fit(dataset.records.view())?;

        let mean = Array1::from(scaler.mean().to_vec());
        let scale = Array1::from(scaler.scale().to_vec());
        let scaled = (&dataset.records - &mean) / &scale;

        let classifier =
            GaussianNaiveBayes::fit(scaled.view(), dataset.targets.view(), labels.len())?;

        Ok(Self {
            format_version: BUNDLE_FORMAT_VERSION,
            labels,
            scaler,
            classifier,
        })
    }

    /// Default model: the 150-sample Iris dataset with the canonical labels.
    pub fn fit_default() -> Result<Self> {
        Self::fit(&linfa_datasets::iris(), ClassLabels::iris())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: ModelBundle = serde_json::from_slice(&bytes)?;
        if bundle.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat(bundle.format_version));
        }
        bundle.scaler.validate()?;
        bundle.classifier.validate()?;
        Ok(bundle)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).map_err(write_err)
    }

    /// Verifies the bundle can serve `expected`: same labels in the same
    /// order, one classifier class per label, and [`N_FEATURES`] inputs.
    pub fn validate_against(&self, expected: &ClassLabels) -> Result<()> {
        expected.ensure_matches(&self.labels)?;
        if self.classifier.n_classes() != self.labels.len() {
            return Err(ModelError::ClassCountMismatch {
                classes: self.classifier.n_classes(),
                labels: self.labels.len(),
            });
        }
        for got in [self.scaler.n_features(), self.classifier.n_features()] {
            if got != N_FEATURES {
                return Err(ModelError::DimensionMismatch {
                    expected: N_FEATURES,
                    got,
                });
            }
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Arc<dyn Scaler>, Arc<dyn Classifier>, ClassLabels) {
        (Arc::new(self.scaler), Arc::new(self.classifier), self.labels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Artifact(PathBuf),
    Fallback,
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Artifact(path) => write!(f, "artifact {}", path.display()),
            ModelSource::Fallback => write!(f, "fallback (fitted at startup)"),
        }
    }
}

#[derive(Debug)]
pub struct LoadedModel {
    pub bundle: ModelBundle,
    pub source: ModelSource,
}

/// Loads the bundle at `path`, falling back to [`ModelBundle::fit_default`]
/// when the artifact cannot be read or decoded.
///
/// An artifact that decodes but does not match `expected` is an error, not a
/// reason to fall back. The fitted fallback is written to `path` only when
/// `persist_fallback` is set and nothing exists there yet.
pub fn load_or_fit(
    path: &Path,
    expected: &ClassLabels,
    persist_fallback: bool,
) -> Result<LoadedModel> {
    match ModelBundle::load(path) {
        Ok(bundle) => {
            bundle.validate_against(expected)?;
            tracing::info!(path = %path.display(), labels = %bundle.labels, "Loaded model bundle");
            Ok(LoadedModel {
                bundle,
                source: ModelSource::Artifact(path.to_path_buf()),
            })
        }
        Err(err) if err.is_load_failure() => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to load model bundle, fitting default model"
            );
            let bundle = ModelBundle::fit_default()?;
            bundle.validate_against(expected)?;

            if persist_fallback && !path.exists() {
                match bundle.save(path) {
                    Ok(()) => tracing::info!(path = %path.display(), "Saved fallback model bundle"),
                    Err(err) => tracing::warn!(error = %err, "Could not persist fallback model bundle"),
                }
            }

            Ok(LoadedModel {
                bundle,
                source: ModelSource::Fallback,
            })
        }
        Err(err) => Err(err),
    }
}
