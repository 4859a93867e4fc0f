use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    cache::CacheStore,
    error::{ApiError, ErrorResponse},
    openapi::ApiDoc,
    service::WeatherService,
    weather::{QueryParameters, WeatherRecord},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn CacheStore>,
    pub weather_service: Arc<WeatherService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// `up` when the cache store answers a ping, otherwise `down`.
    pub cache: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up; cache status reported separately", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = if state.cache.ping().await { "up" } else { "down" };

    Json(HealthResponse {
        status: "healthy".to_string(),
        cache: cache.to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/weather/",
    tag = "weather",
    params(
        ("q" = Option<String>, Query, description = "City name, state code and country code divided by comma. Alias: location"),
        ("lat" = Option<f64>, Query, description = "Latitude, -90 to 90. Requires lon"),
        ("lon" = Option<f64>, Query, description = "Longitude, -180 to 180. Requires lat"),
        ("units" = Option<String>, Query, description = "standard, metric or imperial (default metric)"),
        ("lang" = Option<String>, Query, description = "en, de or it (default en). Alias: language")
    ),
    responses(
        (status = 200, description = "Current weather", body = WeatherRecord),
        (status = 400, description = "Invalid query or provider payload; field name to list of messages"),
        (status = 502, description = "Weather provider failed or answered with an error", body = ErrorResponse),
        (status = 504, description = "Weather provider timed out", body = ErrorResponse)
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<WeatherRecord>, ApiError> {
    let params = QueryParameters::from_raw(&raw)?;
    let record = state.weather_service.get_weather(&params).await?;
    Ok(Json(record))
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .route("/weather/", get(get_weather))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
