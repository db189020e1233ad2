use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("prediction_duration_seconds".to_string()),
            &[0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.1],
        )?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus recorder already initialized");
    }

    ::metrics::describe_counter!("predictions_total", "Prediction requests by endpoint and outcome");
    ::metrics::describe_counter!("prediction_samples_total", "Samples classified");
    ::metrics::describe_histogram!(
        "prediction_duration_seconds",
        ::metrics::Unit::Seconds,
        "Time spent validating and classifying a request"
    );

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

pub async fn handler() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
