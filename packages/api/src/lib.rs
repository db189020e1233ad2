use axum::{Router, routing::get};
use state::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod routes;

pub mod error;
pub mod features;
pub mod openapi;
pub mod pipeline;
pub mod state;

pub use axum;
pub use iris_model;

/// Builds the service router: `/`, `/predict`, `/predict_multiple` and
/// `/openapi.json`. Unknown paths answer 404 and known paths with the wrong
/// method answer 405, both as JSON.
pub fn construct_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::predict::routes())
        .route(
            "/openapi.json",
            get(openapi::openapi_json).fallback(routes::fallback::method_not_allowed),
        )
        .fallback(routes::fallback::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
