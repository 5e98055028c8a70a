use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::ForecastRequest;

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let query = request.validate()?;

    let outcome = state.forecasts.forecast(query).await;

    let mut response = Json(outcome.response).into_response();
    let cache_state = if outcome.cache_hit { "HIT" } else { "MISS" };
    response
        .headers_mut()
        .insert("x-cache", HeaderValue::from_static(cache_state));
    Ok(response)
}
