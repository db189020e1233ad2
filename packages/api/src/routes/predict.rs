use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::features::FeatureVector;
use crate::pipeline::{BatchResult, SingleOutcome};
use crate::routes::fallback::method_not_allowed;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict).fallback(method_not_allowed))
        .route(
            "/predict_multiple",
            post(predict_multiple).fallback(method_not_allowed),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// Missing, `null` and `[]` are all rejected as "No samples provided".
    #[schema(value_type = Option<Vec<Object>>)]
    pub samples: Option<Vec<Value>>,
}

fn record(endpoint: &'static str, outcome: &'static str, samples: usize, started: Instant) {
    metrics::counter!("predictions_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
    metrics::counter!("prediction_samples_total", "endpoint" => endpoint).increment(samples as u64);
    metrics::histogram!("prediction_duration_seconds", "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
}

#[utoipa::path(
    post,
    path = "/predict",
    tag = "prediction",
    request_body = FeatureVector,
    responses(
        (status = 200, description = "Classified sample, or the `unknown` sentinel for atypical measurements", body = SingleOutcome),
        (status = 400, description = "Missing or non-numeric features, or a body that is not a JSON object"),
        (status = 500, description = "Prediction failed")
    )
)]
#[tracing::instrument(name = "POST /predict", skip(state, body))]
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SingleOutcome>, ApiError> {
    let started = Instant::now();
    match classify(&state, body) {
        Ok(outcome) => {
            tracing::debug!(kind = outcome.kind(), "Prediction served");
            record("predict", outcome.kind(), 1, started);
            Ok(Json(outcome))
        }
        Err(err) => {
            record("predict", outcome_of(&err), 0, started);
            Err(err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/predict_multiple",
    tag = "prediction",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "One entry per sample, in input order", body = BatchResult),
        (status = 400, description = "No samples, too many samples, or a malformed body"),
        (status = 500, description = "Batch prediction failed")
    )
)]
#[tracing::instrument(name = "POST /predict_multiple", skip(state, body))]
pub async fn predict_multiple(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let started = Instant::now();
    match classify_batch(&state, body) {
        Ok(batch) => {
            tracing::info!(total_samples = batch.total_samples, "Batch prediction served");
            record("predict_multiple", "classified", batch.total_samples, started);
            Ok(Json(batch))
        }
        Err(err) => {
            record("predict_multiple", outcome_of(&err), 0, started);
            Err(err)
        }
    }
}

fn classify(
    state: &AppState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<SingleOutcome, ApiError> {
    let Json(body) = body?;
    let features = FeatureVector::from_value(&body)?;
    state
        .predictor
        .predict(&features)
        .map_err(ApiError::from_single)
}

fn classify_batch(
    state: &AppState,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<BatchResult, ApiError> {
    let Json(request) = body?;
    let samples = request.samples.unwrap_or_default();
    state
        .predictor
        .predict_batch(&samples, &state.batch_policy)
        .map_err(ApiError::from_batch)
}

fn outcome_of(err: &ApiError) -> &'static str {
    if err.status().is_client_error() {
        "rejected"
    } else {
        "failed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use iris_model::ModelBundle;
    use serde_json::json;

    use crate::pipeline::{BatchPolicy, Predictor};

    fn state() -> AppState {
        let predictor = Predictor::from_bundle(ModelBundle::fit_default().unwrap());
        Arc::new(crate::state::State::new(predictor, BatchPolicy::default()))
    }

    #[test]
    fn invalid_features_are_rejected_before_prediction() {
        let err = classify(&state(), Ok(Json(json!({ "sepal_length": 5.1 })))).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(outcome_of(&err), "rejected");
    }

    #[test]
    fn valid_body_is_classified() {
        let body = json!({
            "sepal_length": 5.1,
            "sepal_width": 3.5,
            "petal_length": 1.4,
            "petal_width": 0.2
        });
        let outcome = classify(&state(), Ok(Json(body))).unwrap();
        assert_eq!(outcome.kind(), "classified");
    }

    #[test]
    fn missing_samples_are_rejected() {
        let request = BatchRequest { samples: None };
        let err = classify_batch(&state(), Ok(Json(request))).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error(), "No samples provided");
    }
}
