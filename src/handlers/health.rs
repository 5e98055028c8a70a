use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::handlers::AppState;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub dataset_loaded: bool,
    pub cache_entries: usize,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.forecasts.model_loaded(),
        dataset_loaded: state.forecasts.dataset_loaded(),
        cache_entries: state.forecasts.cache().len().await,
        timestamp: Utc::now(),
        version: API_VERSION,
    })
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Water Demand Forecasting API",
        "version": API_VERSION,
        "forecast": "/api/forecast",
        "health": "/health",
    }))
}
