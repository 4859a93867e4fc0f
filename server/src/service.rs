//! Cache-aside weather lookups.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, CacheExt, CacheKey, CacheStore};
use crate::error::ApiError;
use crate::weather::{normalize_weather, OpenWeatherClient, QueryParameters, WeatherRecord};

pub struct WeatherService {
    cache: Arc<dyn CacheStore>,
    client: Arc<OpenWeatherClient>,
    ttl: Duration,
}

impl WeatherService {
    pub fn new(cache: Arc<dyn CacheStore>, client: Arc<OpenWeatherClient>, ttl: Duration) -> Self {
        Self { cache, client, ttl }
    }

    /// Serve from cache, or fetch, normalize, validate and cache.
    ///
    /// Nothing is written when the provider fails or its payload does not fit
    /// the record schema. Concurrent misses for one key may both fetch; the
    /// last write wins.
    pub async fn get_weather(&self, params: &QueryParameters) -> Result<WeatherRecord, ApiError> {
        let key = CacheKey::from_params(&params.canonical_params());

        let cached: Option<WeatherRecord> = self.cache.get_json(key.as_str()).await;
        if let Some(record) = cached {
            tracing::debug!("Serving weather for '{}' from cache", key);
            return Ok(record);
        }

        let payload = self.client.get_current_weather(params).await?;
        let record = normalize_weather(&payload).validate()?;

        if !self.cache.set_json(key.as_str(), &record, Some(self.ttl)).await {
            tracing::warn!("Weather for '{}' served uncached", key);
        }

        Ok(record)
    }

    /// Drop every cached variant (units, language, coordinates) for exactly
    /// this location. `location` is trimmed like an inbound `q`.
    pub async fn invalidate_location(&self, location: &str) -> u64 {
        self.cache
            .clear_on_pattern(&keys::location_pattern(location))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::config::Config;
    use crate::weather::{CardinalDirection, Units};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texarkana_payload() -> serde_json::Value {
        json!({
            "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
            "main": {"temp": 17.87, "feels_like": 17.64, "temp_min": 17.05, "temp_max": 18.47,
                     "pressure": 1015, "humidity": 74},
            "wind": {"speed": 5.14, "deg": 190},
            "name": "Texarkana",
            "cod": 200
        })
    }

    fn service_for(server: &MockServer, cache: Arc<dyn CacheStore>) -> WeatherService {
        let config = Config::for_tests(&server.uri());
        let client = Arc::new(OpenWeatherClient::new(&config).unwrap());
        WeatherService::new(cache, client, config.default_ttl())
    }

    fn key_for(params: &QueryParameters) -> String {
        CacheKey::from_params(&params.canonical_params()).to_string()
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Texarkana"))
            .respond_with(ResponseTemplate::new(200).set_body_json(texarkana_payload()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        let service = service_for(&mock_server, cache.clone());
        let params = QueryParameters::for_location("Texarkana");

        let first = service.get_weather(&params).await.unwrap();
        let second = service.get_weather(&params).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.direction, Some(CardinalDirection::South));
        assert!(cache.exists(&key_for(&params)).await);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"cod": "400"})))
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        let service = service_for(&mock_server, cache.clone());
        let params = QueryParameters::for_location("Texarkana");

        let err = service.get_weather(&params).await.unwrap_err();

        assert!(matches!(err, ApiError::Upstream(_)));
        assert!(!cache.exists(&key_for(&params)).await);
    }

    #[tokio::test]
    async fn test_incompatible_payload_is_not_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"main": {"temp": "hot"}})))
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        let service = service_for(&mock_server, cache.clone());
        let params = QueryParameters::for_location("Texarkana");

        let err = service.get_weather(&params).await.unwrap_err();

        match err {
            ApiError::Validation(errors) => assert!(errors.field("temperature").is_some()),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(!cache.exists(&key_for(&params)).await);
    }

    #[tokio::test]
    async fn test_offline_cache_still_serves() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(texarkana_payload()))
            .expect(2)
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        cache.set_connected(false);
        let service = service_for(&mock_server, cache.clone());
        let params = QueryParameters::for_location("Texarkana");

        assert!(service.get_weather(&params).await.is_ok());
        assert!(service.get_weather(&params).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_location_covers_every_variant() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(texarkana_payload()))
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        let service = service_for(&mock_server, cache.clone());
        let metric = QueryParameters::for_location("Texarkana");
        let imperial = QueryParameters {
            units: Units::Imperial,
            ..metric.clone()
        };
        let other = QueryParameters::for_location("Berlin");

        for params in [&metric, &imperial, &other] {
            service.get_weather(params).await.unwrap();
        }

        assert_eq!(service.invalidate_location("Texarkana").await, 2);
        assert!(!cache.exists(&key_for(&metric)).await);
        assert!(!cache.exists(&key_for(&imperial)).await);
        assert!(cache.exists(&key_for(&other)).await);
    }

    #[tokio::test]
    async fn test_invalidate_location_leaves_similar_names_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(texarkana_payload()))
            .mount(&mock_server)
            .await;

        let cache = Arc::new(MemoryCacheStore::new(Duration::from_secs(60)));
        let service = service_for(&mock_server, cache.clone());
        let berlin = QueryParameters::for_location("Berlin");
        let berlin_de = QueryParameters::for_location("Berlin,DE");
        let berlingen = QueryParameters::for_location("Berlingen");

        for params in [&berlin, &berlin_de, &berlingen] {
            service.get_weather(params).await.unwrap();
        }

        assert_eq!(service.invalidate_location("Berlin").await, 1);
        assert!(!cache.exists(&key_for(&berlin)).await);
        assert!(cache.exists(&key_for(&berlin_de)).await);
        assert!(cache.exists(&key_for(&berlingen)).await);

        assert_eq!(service.invalidate_location("  Berlin,DE ").await, 1);
        assert!(!cache.exists(&key_for(&berlin_de)).await);
        assert!(cache.exists(&key_for(&berlingen)).await);
    }
}
