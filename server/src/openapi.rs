use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::routes::HealthResponse;
use crate::weather::{CardinalDirection, WeatherRecord};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Cache Proxy API",
        description = "Current weather from OpenWeatherMap, normalized and cached in Redis"
    ),
    paths(crate::routes::get_weather, crate::routes::health),
    components(schemas(WeatherRecord, CardinalDirection, ErrorResponse, HealthResponse)),
    tags(
        (name = "weather", description = "Current weather lookups"),
        (name = "health", description = "Service and cache status")
    )
)]
pub struct ApiDoc;
