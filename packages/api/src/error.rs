use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::features::{FEATURE_NAMES, ValidationError};
use crate::pipeline::PredictionError;

/// Error surfaced to HTTP clients. Serialized as a flat JSON object whose
/// `error` field names the failure kind; `details` adds sibling fields such
/// as `message`, `required` or `limit`.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Map<String, Value>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        let error = error.into();
        tracing::warn!("Bad request: {}", error);
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Endpoint not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn prediction_failed(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Prediction failed: {}", msg);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed").with("message", msg)
    }

    pub fn batch_failed(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Batch prediction failed: {}", msg);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Batch prediction failed").with("message", msg)
    }

    /// Maps an error from the single prediction path.
    pub fn from_single(err: PredictionError) -> Self {
        match err {
            PredictionError::Validation(err) => err.into(),
            other => Self::prediction_failed(other.to_string()),
        }
    }

    /// Maps an error from the batch path. Request-level validation (empty or
    /// oversized batch) stays a 400; any per-sample failure fails the batch.
    pub fn from_batch(err: PredictionError) -> Self {
        match err {
            PredictionError::Validation(
                err @ (ValidationError::NoSamples | ValidationError::TooManySamples { .. }),
            ) => err.into(),
            other => Self::batch_failed(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingFeatures { missing } => {
                Self::bad_request("Missing required features")
                    .with("required", FEATURE_NAMES.to_vec())
                    .with("missing", missing)
            }
            ValidationError::InvalidFeature { field, found } => {
                let message = format!("`{field}` must be a number, got {found}");
                Self::bad_request("Invalid feature value")
                    .with("field", field)
                    .with("message", message)
            }
            ValidationError::InvalidBody(message) => {
                Self::bad_request("Invalid JSON body").with("message", message)
            }
            ValidationError::NoSamples => Self::bad_request("No samples provided"),
            ValidationError::TooManySamples { limit, .. } => {
                Self::bad_request("Too many samples").with("limit", limit)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::InvalidBody(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::with_capacity(self.details.len() + 1);
        body.insert("error".to_string(), json!(self.error));
        body.extend(self.details);
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.error)
    }
}
