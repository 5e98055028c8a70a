pub mod forecasts;
pub mod health;
pub mod regions;

use std::sync::Arc;

use crate::service::ForecastService;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub forecasts: Arc<ForecastService>,
}
