mod cache;
mod config;
mod db;
mod errors;
mod handlers;
mod jobs;
mod ml;
mod models;
mod ratelimit;
mod routes;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::ResponseCache;
use crate::config::{AppConfig, DataConfig};
use crate::db::{CountryDataset, CountryRepo};
use crate::handlers::AppState;
use crate::ml::baseline::BaselineResolver;
use crate::ml::forecast::ForecastSynthesizer;
use crate::ml::predictor::{LinearModel, Predictor};
use crate::ratelimit::{RateLimitState, RateLimiter};
use crate::service::ForecastService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "watercast=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded");

    // Dataset and model are loaded once and shared read-only
    let dataset = load_dataset(&config.data);
    let predictor = load_predictor(&config.data);

    let cache = ResponseCache::new(config.cache.ttl());
    let limiter = RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window());

    let service = ForecastService::new(
        BaselineResolver::new(dataset),
        predictor,
        ForecastSynthesizer::from_entropy(),
        cache.clone(),
        config.predictor.timeout(),
    );

    let state = AppState {
        forecasts: Arc::new(service),
    };
    let rate_limit = RateLimitState {
        limiter: limiter.clone(),
        enabled: config.rate_limit.enabled,
        trust_forwarded_headers: config.rate_limit.trust_forwarded_headers,
    };

    // Spawn background jobs
    let maintenance = jobs::spawn_maintenance(
        cache,
        limiter,
        std::time::Duration::from_secs(config.jobs.maintenance_interval_secs),
    );

    let app = routes::router(state, rate_limit, routes::cors_layer(&config.cors));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting water demand forecasting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.abort();
    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn load_dataset(config: &DataConfig) -> Option<Arc<CountryDataset>> {
    match CountryRepo::load(&config.dataset_path) {
        Ok(dataset) => Some(Arc::new(dataset)),
        Err(e) => {
            tracing::warn!(path = %config.dataset_path, error = %e, "Country data unavailable, using static baselines");
            None
        }
    }
}

fn load_predictor(config: &DataConfig) -> Option<Arc<dyn Predictor>> {
    match LinearModel::load(&config.model_path) {
        Ok(Some(model)) => {
            tracing::info!(path = %config.model_path, version = %model.version(), "Model loaded successfully");
            Some(Arc::new(model))
        }
        Ok(None) => {
            tracing::warn!(path = %config.model_path, "Model file not found, using fallback predictions");
            None
        }
        Err(e) => {
            tracing::error!(path = %config.model_path, error = %e, "Error loading model, using fallback predictions");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
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

    tracing::info!("Shutdown signal received");
}
