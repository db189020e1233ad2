use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("feature {index} is not a finite number")]
    NonFinite { index: usize },

    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("class {class} has no training samples")]
    EmptyClass { class: usize },

    #[error("target {target} is outside the {n_classes} known classes")]
    UnknownTarget { target: usize, n_classes: usize },

    #[error("unsupported model bundle format version {0}")]
    UnsupportedFormat(u32),

    #[error("class labels mismatch: expected {expected}, found {found}")]
    LabelMismatch { expected: String, found: String },

    #[error("classifier knows {classes} classes but {labels} labels are configured")]
    ClassCountMismatch { classes: usize, labels: usize },

    #[error("failed to read model bundle {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write model bundle {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fit classifier: {0}")]
    Fit(#[from] linfa_bayes::NaiveBayesError),

    #[error("malformed model bundle: {0}")]
    Json(#[from] serde_json::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ModelError {
    /// Errors raised while reading or decoding an artifact, as opposed to an
    /// artifact that decoded fine but does not fit the service.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ModelError::Read { .. } | ModelError::Json(_) | ModelError::UnsupportedFormat(_)
        )
    }
}
