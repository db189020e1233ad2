use axum::http::{Method, Uri};

use crate::error::ApiError;

pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(%method, %uri, "No route matched");
    ApiError::not_found()
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(%method, %uri, "Method not allowed");
    ApiError::method_not_allowed()
}
