//! Trained collaborators for the Iris prediction service
//!
//! The service treats the scaler and the classifier as opaque capabilities
//! behind the [`Scaler`] and [`Classifier`] traits. This crate provides the
//! concrete implementations (a standard scaler and a Gaussian naive Bayes
//! classifier), the versioned class-label mapping that ties classifier indices
//! to species names, and the bundle bootstrap that loads a persisted artifact
//! or fits a fresh model on the bundled Iris dataset.

pub mod bundle;
pub mod classifier;
pub mod error;
pub mod labels;
pub mod scaler;

pub use bundle::{LoadedModel, ModelBundle, ModelSource, load_or_fit};
pub use classifier::{Classifier, GaussianNaiveBayes};
pub use error::{ModelError, Result};
pub use labels::ClassLabels;
pub use scaler::{Scaler, StandardScaler};

/// Number of measurements per sample the default model is fitted on.
pub const N_FEATURES: usize = 4;
