use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_cache_proxy::{
    cache::{build_store, CacheStore},
    config::Config,
    routes::{create_router, AppState},
    service::WeatherService,
    weather::OpenWeatherClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_cache_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize cache store
    let cache = build_store(&config)?;
    if cache.ping().await {
        tracing::info!("Cache store reachable");
    } else {
        tracing::warn!("Cache store unreachable; serving uncached until it recovers");
    }
    if config.cache_flush_on_start {
        cache.flush_db().await;
    }

    // Initialize weather client
    let client = Arc::new(OpenWeatherClient::new(&config)?);
    let weather_service = Arc::new(WeatherService::new(
        cache.clone(),
        client,
        config.default_ttl(),
    ));

    // Create application state
    let state = AppState {
        cache,
        weather_service,
    };

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server starting on http://{}", config.server_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
