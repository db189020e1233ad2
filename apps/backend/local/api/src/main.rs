#[cfg(not(any(all(target_os = "macos", target_arch = "aarch64"), target_os = "ios")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use axum::routing::get;
use dotenv::dotenv;
use iris_api::{
    construct_router,
    pipeline::Predictor,
    state::State,
};
use iris_model::{ClassLabels, load_or_fit};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Iris Classification API");

    let config = config::Config::from_env()?;
    tracing::info!(
        "Loaded configuration: port={}, model_path={}, batch_policy={:?}",
        config.port,
        config.model_path.display(),
        config.batch_policy
    );

    metrics::init_metrics()?;

    let loaded = load_or_fit(
        &config.model_path,
        &ClassLabels::iris(),
        config.persist_fallback_model,
    )?;
    tracing::info!(
        "Model ready from {} with labels {}",
        loaded.source,
        loaded.bundle.labels
    );

    let predictor = Predictor::from_bundle(loaded.bundle);
    let state = Arc::new(State::new(predictor, config.batch_policy));

    let app = construct_router(state).route("/metrics", get(metrics::handler));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal, draining connections");
}
