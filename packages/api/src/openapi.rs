use axum::Json;
use utoipa::OpenApi;

use crate::features::FeatureVector;
use crate::pipeline::{
    BatchEntry, BatchFailure, BatchOutOfRange, BatchPrediction, BatchResult, OutOfRange,
    PredictionResult, SingleOutcome,
};
use crate::routes::{health, predict};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Iris Classification API",
        version = "1.0.0",
        description = "Classifies iris flowers into setosa, versicolor or virginica from four measurements in centimetres.",
        license(name = "MIT")
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "prediction", description = "Single and batch classification")
    ),
    paths(
        health::health,
        predict::predict,
        predict::predict_multiple,
    ),
    components(schemas(
        health::HealthResponse,
        predict::BatchRequest,
        FeatureVector,
        PredictionResult,
        OutOfRange,
        SingleOutcome,
        BatchPrediction,
        BatchOutOfRange,
        BatchFailure,
        BatchEntry,
        BatchResult,
    ))
)]
pub struct ApiDoc;

#[tracing::instrument(name = "GET /openapi.json")]
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
