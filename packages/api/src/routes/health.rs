use axum::Json;
use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::routes::fallback::method_not_allowed;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(health).fallback(method_not_allowed))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[tracing::instrument(name = "GET /")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Iris Classification API is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
